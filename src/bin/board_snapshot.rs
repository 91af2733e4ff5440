use dotenvy::dotenv;

use signup_board::config::BoardConfig;
use signup_board::services::remote_store::{HttpRemoteStore, RemoteStore};
use signup_board::services::renderer::badge_for;

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = match BoardConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("invalid configuration: {}", e);
            std::process::exit(2);
        }
    };
    let store = match HttpRemoteStore::from_config(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("cannot build activities client: {}", e);
            std::process::exit(2);
        }
    };

    match store.list_activities().await {
        Ok(snapshot) => {
            for (name, activity) in snapshot.iter() {
                println!(
                    "{} ({}) - {} spots left",
                    name,
                    activity.schedule,
                    activity.spots_left()
                );
                if activity.participants.is_empty() {
                    println!("    no participants yet");
                }
                for email in &activity.participants {
                    println!("    [{:>2}] {}", badge_for(email), email);
                }
            }
            println!("{} activities", snapshot.len());
        }
        Err(e) => {
            eprintln!("failed to load activities: {}", e);
            std::process::exit(1);
        }
    }
}
