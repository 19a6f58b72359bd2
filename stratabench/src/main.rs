fn main() {
    if let Err(e) = stratabench::run() {
        std::process::exit(stratabench::report_error(&e));
    }
}
