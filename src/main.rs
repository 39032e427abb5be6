use actix_cors::Cors;
use actix_web::{App, HttpServer, web::Data};
use actix_web::http::header;
use actix_web::middleware::Logger;
use drivelite::config::Config;
use drivelite::db::Db;
use env_logger::Env;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Info by default, overridable through RUST_LOG
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cfg = Config::from_env_config();

    let db = Db::connect_and_migrate(&cfg.database_path)
        .await
        .expect("database init failed");

    log::info!("Starting server at {}", cfg.listen);

    let listen_addr = cfg.listen.clone();
    HttpServer::new(move || {
        let cors = Cors::permissive()
            .allowed_methods(vec!["GET", "POST", "PATCH", "PUT", "DELETE"])
            .allowed_headers(vec![header::AUTHORIZATION, header::ACCEPT, header::CONTENT_TYPE])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(Data::new(cfg.clone()))
            .app_data(Data::new(db.clone()))
            .configure(drivelite::configure_api)
    })
    .bind(listen_addr)?
    .run()
    .await
}
