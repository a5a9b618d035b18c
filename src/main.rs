use std::path::PathBuf;

fn main() {
    if handle_cli_flags() {
        return;
    }

    if let Err(err) = giftwrap::run() {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

fn handle_cli_flags() -> bool {
    let mut saw_flag = false;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("Giftwrap {}", giftwrap::VERSION);
                saw_flag = true;
            }
            "--help" | "-h" => {
                println!(
                    "Giftwrap — An animated gift reveal experience for the terminal.\n\n  --version, -V          Show version and exit\n  --help,    -h          Show this help message\n  --check-catalog PATH   Validate a gift catalog and exit"
                );
                saw_flag = true;
            }
            "--check-catalog" => {
                saw_flag = true;
                let path = args.next().map(PathBuf::from);
                if let Err(err) = check_catalog_once(path) {
                    eprintln!("Catalog check failed: {err:?}");
                    std::process::exit(1);
                }
            }
            _ => {}
        }
    }
    saw_flag
}

fn check_catalog_once(path: Option<PathBuf>) -> anyhow::Result<()> {
    let catalog = giftwrap::catalog::load_or_default(path.as_deref())?;
    println!(
        "Catalog OK: {} gift(s){}",
        catalog.gifts.len(),
        match path {
            Some(path) => format!(" in {}", path.display()),
            None => " (built-in sample)".to_string(),
        }
    );
    Ok(())
}
