use std::time::{Duration, Instant};

/// Timer optimized for sequential phases: each `lap()` uses a single `Instant::now()`.
pub struct LapTimer(Instant);

impl LapTimer {
    #[inline]
    pub fn start() -> Self {
        Self(Instant::now())
    }

    #[inline]
    pub fn lap(&mut self) -> Duration {
        let now = Instant::now();
        let d = now.duration_since(self.0);
        self.0 = now;
        d
    }
}

/// Phase timings of one clustering invocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhaseTimings {
    /// Catalog enumeration and descending sort.
    pub catalog: Duration,
    /// Descending walk or threshold expansion.
    pub walk: Duration,
    /// Connectivity post-pass (zero for other policies).
    pub post_pass: Duration,
    /// Writing representative ids to the output buffer.
    pub write: Duration,
    pub total: Duration,
}

impl PhaseTimings {
    pub fn report(&self, cells: usize, policy: &str) {
        let ms = |d: Duration| d.as_secs_f64() * 1000.0;
        let pct = |d: Duration| {
            if self.total.as_nanos() == 0 {
                0.0
            } else {
                d.as_secs_f64() / self.total.as_secs_f64() * 100.0
            }
        };

        eprintln!("timing cells={} policy={}", cells, policy);
        eprintln!("  catalog:   {:8.3}ms ({:4.1}%)", ms(self.catalog), pct(self.catalog));
        eprintln!("  walk:      {:8.3}ms ({:4.1}%)", ms(self.walk), pct(self.walk));
        if self.post_pass.as_nanos() > 0 {
            eprintln!("  post_pass: {:8.3}ms ({:4.1}%)", ms(self.post_pass), pct(self.post_pass));
        }
        eprintln!("  write:     {:8.3}ms ({:4.1}%)", ms(self.write), pct(self.write));
        eprintln!("  total:     {:8.3}ms", ms(self.total));
    }
}

/// Collects phase durations as the driver runs.
pub struct TimingBuilder {
    timings: PhaseTimings,
}

impl TimingBuilder {
    pub fn new() -> Self {
        Self {
            timings: PhaseTimings::default(),
        }
    }

    pub fn set_catalog(&mut self, d: Duration) {
        self.timings.catalog = d;
    }

    pub fn set_walk(&mut self, d: Duration) {
        self.timings.walk = d;
    }

    pub fn set_post_pass(&mut self, d: Duration) {
        self.timings.post_pass = d;
    }

    pub fn set_write(&mut self, d: Duration) {
        self.timings.write = d;
    }

    pub fn finish(mut self) -> PhaseTimings {
        let t = &mut self.timings;
        t.total = t.catalog + t.walk + t.post_pass + t.write;
        self.timings
    }
}
