fn main() {
    match handle_cli_flags() {
        Ok(true) => return,
        Ok(false) => {}
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    }

    if let Err(err) = gameboard::run() {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

fn handle_cli_flags() -> anyhow::Result<bool> {
    let mut saw_flag = false;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("Gameboard {}", gameboard::VERSION);
                saw_flag = true;
            }
            "--help" | "-h" => {
                println!(
                    "Gameboard: a terminal client for game community boards.\n\n  --version, -V          Show version and exit\n  --help,    -h          Show this help message\n  --logout               Forget the stored session and exit\n  --set-server <url>     Save the backend address to the config file and exit"
                );
                saw_flag = true;
            }
            "--logout" => {
                saw_flag = true;
                let store = gameboard::storage::Store::open(Default::default())?;
                let removed = store.clear_sessions()?;
                if removed == 0 {
                    println!("No stored session.");
                } else {
                    println!("Signed out.");
                }
            }
            "--set-server" => {
                saw_flag = true;
                let Some(url) = args.next() else {
                    anyhow::bail!("--set-server needs a URL");
                };
                let path = gameboard::config::save_api_base_url(None, &url)?;
                println!(
                    "Server set to {url} in {}",
                    gameboard::app::friendly_path(Some(&path))
                );
            }
            _ => {}
        }
    }
    Ok(saw_flag)
}
