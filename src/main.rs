#[macro_use]
extern crate rocket;

use log::info;
use rocket::{Build, Rocket};

mod auth;
mod config;
mod data_access;
mod db;
mod error;
mod files;
mod friends;
mod history;
mod models;
mod prayer_logs;
mod profile;
mod stats;
mod utils;

#[cfg(test)]
mod test_support;

use config::Config;
use db::{establish_db, DbConn};

#[derive(Clone)]
pub struct AppState {
    pub db: DbConn,
    pub config: Config,
}

pub fn build_rocket(state: AppState) -> Rocket<Build> {
    rocket::build()
        .manage(state)
        .register("/", catchers![error::default_catcher])
        .mount("/api/auth", routes![auth::register, auth::login])
        .mount(
            "/api/friends",
            routes![
                friends::list_friends,
                friends::add_friend,
                friends::remove_friend,
                friends::friends_logs
            ],
        )
        .mount(
            "/api/prayer-logs",
            routes![
                prayer_logs::post_status,
                prayer_logs::day_logs,
                prayer_logs::history_page,
                prayer_logs::statistics
            ],
        )
        .mount("/api/prayers", routes![prayer_logs::list_prayers])
        .mount(
            "/api/profile",
            routes![
                profile::get_profile,
                profile::update_profile,
                files::upload_image,
                files::delete_image,
                files::serve_image
            ],
        )
}

#[rocket::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = Config::from_env();
    let db_pool = establish_db(&config).await?;
    info!("Database ready at {}", config.database_url);

    tokio::fs::create_dir_all(config.avatars_dir()).await?;

    info!("Starting Rocket server...");
    build_rocket(AppState {
        db: db_pool,
        config,
    })
    .launch()
    .await?;

    Ok(())
}
