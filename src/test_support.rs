use rocket::local::asynchronous::Client;
use tempfile::TempDir;

use crate::config::Config;
use crate::db::{memory_db, DbConn};
use crate::{build_rocket, AppState};

pub const TEST_SECRET: &str = "test-secret";

/// A tracked client over a fresh in-memory database. The temp dir holds
/// uploads and must outlive the client.
pub async fn client() -> (Client, DbConn, TempDir) {
    let dir = tempfile::tempdir().expect("temp dir");
    let db = memory_db().await;
    let mut config = Config::for_tests(dir.path().to_path_buf());
    config.jwt_secret = TEST_SECRET.to_string();

    let state = AppState {
        db: db.clone(),
        config,
    };
    let client = Client::tracked(build_rocket(state))
        .await
        .expect("valid rocket instance");
    (client, db, dir)
}
