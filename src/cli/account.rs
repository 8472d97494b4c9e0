use std::error::Error;
use std::io::{self, BufRead, Write};

use crate::auth::CredentialStore;
use crate::core::store::LocalStore;
use crate::core::user::UserSession;

pub fn login(store: &LocalStore, name: Option<&str>, email: &str) -> Result<(), Box<dyn Error>> {
    let user = UserSession::new(store).login(name, email)?;
    println!("✓ Signed in as {} <{}>", user.name, user.email);
    Ok(())
}

pub fn logout(store: &LocalStore) -> Result<(), Box<dyn Error>> {
    if UserSession::new(store).logout()? {
        println!("✓ Signed out");
    } else {
        println!("Nobody is signed in.");
    }
    Ok(())
}

pub fn whoami(store: &LocalStore) -> Result<(), Box<dyn Error>> {
    match UserSession::new(store).load()? {
        Some(user) => {
            println!("{} <{}>", user.name, user.email);
            println!("  id:     {}", user.id);
            println!("  avatar: {}", user.avatar);
        }
        None => {
            println!("Nobody is signed in.");
            println!("\n💡 Sign in with:");
            println!("   heartline login --email <address> [--name <name>]");
        }
    }

    let credentials = CredentialStore::new();
    match credentials.resolve() {
        Ok(Some(credential)) => println!("API key: configured via {}", credential.source),
        Ok(None) => println!("API key: not configured (run `heartline auth`)"),
        Err(e) => println!("API key: unavailable ({e})"),
    }
    Ok(())
}

pub fn auth() -> Result<(), Box<dyn Error>> {
    println!("🔐 Heartline Authentication");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    print!("Enter your API key: ");
    io::stdout().flush()?;

    let mut key = String::new();
    io::stdin().lock().read_line(&mut key)?;

    CredentialStore::new().store(&key)?;
    println!();
    println!("✅ API key stored securely in your system keyring.");
    println!("You can now chat without setting environment variables.");
    Ok(())
}

pub fn deauth() -> Result<(), Box<dyn Error>> {
    if CredentialStore::new().remove()? {
        println!("✓ API key removed from the system keyring");
    } else {
        println!("No stored API key found.");
    }
    Ok(())
}
