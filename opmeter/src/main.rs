fn main() {
    if let Err(e) = opmeter::run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
