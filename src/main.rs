#[actix_web::main]
async fn main() {
    if let Err(err) = callcenter130_lib::run().await {
        eprintln!("callcenter130: {}", err);
        std::process::exit(1);
    }
}
