/// Coarse timer for logging how long a task took. Callers fold the
/// returned milliseconds into their own log line.
pub struct TaskTimer {
    start_time: std::time::Instant,
    task_name: String,
}

impl TaskTimer {
    pub fn new(task_name: impl AsRef<str>) -> Self {
        println!("Task: {} started", task_name.as_ref());
        Self {
            start_time: std::time::Instant::now(),
            task_name: task_name.as_ref().to_string(),
        }
    }

    /// Stop the timer and return the elapsed time in milliseconds.
    pub fn finish(self) -> u64 {
        let elapsed_ms = self.start_time.elapsed().as_millis() as u64;
        println!("Task: {} finished in {}ms", self.task_name, elapsed_ms);
        elapsed_ms
    }
}
