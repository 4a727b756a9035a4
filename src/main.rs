fn main() -> std::process::ExitCode {
  mpdremote::run()
}
