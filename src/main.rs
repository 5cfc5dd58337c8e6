fn main() {
    if let Err(err) = trial_scrub::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
