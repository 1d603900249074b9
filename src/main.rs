fn main() {
    #[cfg(feature = "cli")]
    lz4arc::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("lz4arc: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}
