#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    visa_form_server::run().await
}
