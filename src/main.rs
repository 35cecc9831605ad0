fn main() {
    #[cfg(feature = "cli")]
    bindelta::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("bindelta: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}
