pub mod timer;

pub use timer::create_redis_client;
pub use timer::RedisTimerStore;
pub use timer::TimerWriterHandle;
