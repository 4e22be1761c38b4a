//! Example: validate directory definitions and show the searches they produce.
//!
//! Usage: `cargo run -p healer-discovery --example check-directories [DIR]`

use healer_discovery::{DirectoryDefinition, DirectoryLoader};

fn describe(def: &DirectoryDefinition) {
    let pairs = def.search_pairs();
    println!("  • {} ({})", def.name(), def.id());
    println!("    Platform: {}", def.platform());
    println!("    Searches: {}", pairs.len());
    if let Some((term, location)) = pairs.first() {
        println!("    First URL: {}", def.search_url(term, location));
    }
    println!();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let builtin = DirectoryLoader::builtin()?;
    println!("✓ {} built-in directory definitions:\n", builtin.len());
    builtin.iter().for_each(describe);

    if let Some(dir) = std::env::args().nth(1) {
        let loader = DirectoryLoader::new(&dir)?;
        let definitions = loader.load_all()?;
        println!("✓ {} valid definitions in {dir}:\n", definitions.len());
        definitions.iter().for_each(describe);
    }

    Ok(())
}
