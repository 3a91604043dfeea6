pub mod surveillance;

pub fn init_logging() {
    // 幂等初始化，库可能被嵌入到已有日志环境的宿主里
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
