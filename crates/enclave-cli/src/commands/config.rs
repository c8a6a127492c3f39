use anyhow::Result;
use enclave_search::{config, Config};
use std::path::Path;

fn secret(value: Option<&String>) -> &'static str {
    match value {
        Some(v) if !v.trim().is_empty() => "<set>",
        _ => "<not set>",
    }
}

/// Show the current effective configuration.
pub fn show_config(config: &Config, config_path: &Path) -> Result<()> {
    println!("Current Configuration");
    println!("=====================\n");

    println!("Config file: {}", config_path.display());

    let exists = config_path.exists();
    println!("File exists: {}\n", if exists { "yes" } else { "no (using defaults)" });

    println!("Search backend:");
    println!(
        "  search_endpoint: {}",
        config.search_endpoint.as_deref().unwrap_or("<not set>")
    );
    println!("  search_api_key: {}", secret(config.search_api_key.as_ref()));
    println!("  search_api_version: {}", config.search_api_version);
    println!("  vector_dimensions: {}", config.vector_dimensions);
    println!("  request_timeout_secs: {}", config.request_timeout_secs);
    println!("  max_retries: {}", config.max_retries);

    println!("\nEmbedding provider:");
    println!(
        "  embedding_endpoint: {}",
        config.embedding_endpoint.as_deref().unwrap_or("<not set>")
    );
    println!(
        "  embedding_api_key: {}",
        secret(config.embedding_api_key.as_ref())
    );
    println!(
        "  embedding_deployment: {}",
        config.embedding_deployment.as_deref().unwrap_or("<not set>")
    );
    println!("  embedding_api_version: {}", config.embedding_api_version);

    println!("\nLogging:");
    println!("  logging.level: {:?}", config.logging.level());
    println!("  logging.coloured: {}", config.logging.coloured());
    println!("  logging.output: {:?}", config.logging.output());

    println!("\nPriority: ENV vars (ENCLAVE_*) > Config file > Defaults");

    Ok(())
}

/// Show the config file path.
pub fn show_path(config_path: &Path) {
    println!("{}", config_path.display());
}

/// Show example configuration.
pub fn show_example() {
    print!("{}", config::example_config());
}

/// Initialize config file with defaults.
pub fn init_config(config_path: &Path) -> Result<()> {
    let created = config::ensure_config_file_at(config_path)?;

    if created {
        println!("✓ Created config file: {}", config_path.display());
        println!("\nEdit this file to point enclave at your search service.");
    } else {
        println!("Config file already exists: {}", config_path.display());
    }

    Ok(())
}
