use chrono::Local;
use env_logger::Env;
use std::io::Write;

/// 初始化日志：时间 + 级别。默认 info，`verbose` 时为 debug，RUST_LOG 优先。
pub fn init_logger(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%d %H:%M:%S");
            writeln!(buf, "{} {} - {}", ts, record.level(), record.args())
        })
        .try_init();
}
