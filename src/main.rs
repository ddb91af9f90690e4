fn main() {
    if let Err(err) = barologger_lib::run() {
        eprintln!("barologger: {err:#}");
        std::process::exit(1);
    }
}
