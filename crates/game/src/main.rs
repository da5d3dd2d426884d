mod app;

fn main() {
    if let Err(error) = app::run() {
        eprintln!("bramblewick: {error}");
        std::process::exit(1);
    }
}
