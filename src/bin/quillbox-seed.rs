//! Creates the development `admin` account when it does not exist yet.

use quillbox::{auth::password, config::Settings, errors::ServerError, store};

const ADMIN_USERNAME: &str = "admin";
const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "admin123";

fn main() -> Result<(), ServerError> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let settings = Settings::from_env()?;
    let store = store::open(&settings)?;

    if store.find_by_username(ADMIN_USERNAME)?.is_some() {
        log::info!("user {ADMIN_USERNAME} already exists");
        return Ok(());
    }

    let record = password::hash(ADMIN_PASSWORD)?;
    let user = store.create_user(ADMIN_USERNAME, ADMIN_EMAIL, &record)?;
    log::info!(
        "created user {} <{}> with password {ADMIN_PASSWORD}",
        user.username,
        user.email
    );
    Ok(())
}
