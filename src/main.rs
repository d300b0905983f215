fn main() {
    if let Err(error) = questdrop_report::run() {
        eprintln!("questdrop-report: {error}");
        std::process::exit(1);
    }
}
