fn main() {
    if handle_cli_flags() {
        return;
    }

    if let Err(err) = hobbyhub::run() {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

fn handle_cli_flags() -> bool {
    let mut saw_flag = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("HobbyHub {}", hobbyhub::VERSION);
                saw_flag = true;
            }
            "--help" | "-h" => {
                println!(
                    "HobbyHub — Create, browse, and discuss hobby posts from the terminal.\n\nPosts live in memory only and are gone when you quit.\n\n  --version, -V        Show version and exit\n  --help,    -h        Show this help message\n\nConfig: {}",
                    hobbyhub::config::default_path()
                        .map(|path| path.display().to_string())
                        .unwrap_or_else(|| "(no config directory)".to_string())
                );
                saw_flag = true;
            }
            _ => {}
        }
    }
    saw_flag
}
