fn main() -> std::process::ExitCode {
    agriverse_lib::run()
}
