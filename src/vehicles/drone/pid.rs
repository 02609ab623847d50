use crate::config::PidGains;

/// Altitude-hold PID with a clamped integral and derivative on error
#[derive(Debug, Clone)]
pub struct AltitudePid {
    gains: PidGains,
    integral: f64,
    last_error: Option<f64>,
}

impl AltitudePid {
    pub fn new(gains: PidGains) -> Self {
        Self {
            gains,
            integral: 0.0,
            last_error: None,
        }
    }

    /// Thrust correction for one tick; positive means climb.
    pub fn update(&mut self, target: f64, current: f64, dt: f64) -> f64 {
        let error = target - current;
        if !(error.is_finite() && dt.is_finite() && dt > 0.0) {
            return 0.0;
        }

        let limit = self.gains.integral_limit;
        self.integral = (self.integral + error * dt).clamp(-limit, limit);

        // No derivative kick on the first sample after a reset
        let derivative = match self.last_error {
            Some(last) => (error - last) / dt,
            None => 0.0,
        };
        self.last_error = Some(error);

        self.gains.kp * error + self.gains.ki * self.integral + self.gains.kd * derivative
    }

    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.last_error = None;
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn set_gains(&mut self, gains: PidGains) {
        self.gains = gains;
        self.integral = self.integral.clamp(-gains.integral_limit, gains.integral_limit);
    }
}
