//! Independent-source waveforms. Each variant
//! evaluates to an instantaneous value at time `t` and can publish the
//! breakpoint times the transient driver must land a step on exactly.

/// A single-edge pulse train, repeating every `period` seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct Pulse {
    pub initial_value: f64,
    pub pulsed_value: f64,
    pub delay_time: f64,
    pub rise_time: f64,
    pub fall_time: f64,
    pub pulse_width: f64,
    pub period: f64,
}

impl Pulse {
    #[must_use]
    pub fn value_at(&self, time: f64) -> f64 {
        if time < self.delay_time {
            return self.initial_value;
        }
        // PER=0 is SPICE's single-shot convention: one pulse, no repeat.
        // Matches the `period <= 0.0` special case in `breakpoints` below.
        let t = if self.period <= 0.0 {
            time - self.delay_time
        } else {
            (time - self.delay_time) % self.period
        };
        if t < self.rise_time {
            self.initial_value + (self.pulsed_value - self.initial_value) * (t / self.rise_time)
        } else if t < self.rise_time + self.pulse_width {
            self.pulsed_value
        } else if t < self.rise_time + self.pulse_width + self.fall_time {
            self.pulsed_value
                + (self.initial_value - self.pulsed_value)
                    * ((t - self.rise_time - self.pulse_width) / self.fall_time)
        } else {
            self.initial_value
        }
    }

    /// Edge times within the first `upto` seconds: delay, end-of-rise,
    /// end-of-pulse-width, end-of-fall, repeated every period.
    #[must_use]
    pub fn breakpoints(&self, upto: f64) -> Vec<f64> {
        let mut points = Vec::new();
        if self.period <= 0.0 {
            for edge in [
                self.delay_time,
                self.delay_time + self.rise_time,
                self.delay_time + self.rise_time + self.pulse_width,
                self.delay_time + self.rise_time + self.pulse_width + self.fall_time,
            ] {
                if edge <= upto {
                    points.push(edge);
                }
            }
            return points;
        }
        let mut cycle_start = self.delay_time;
        while cycle_start <= upto {
            for edge in [
                cycle_start,
                cycle_start + self.rise_time,
                cycle_start + self.rise_time + self.pulse_width,
                cycle_start + self.rise_time + self.pulse_width + self.fall_time,
            ] {
                if edge <= upto {
                    points.push(edge);
                }
            }
            cycle_start += self.period;
        }
        points
    }
}

/// A damped (or undamped, if `theta == 0`) sinusoid that starts at `delay`.
#[derive(Debug, Clone, PartialEq)]
pub struct Sin {
    pub offset: f64,
    pub amplitude: f64,
    pub frequency: f64,
    pub delay: f64,
    pub theta: f64,
    pub phase_deg: f64,
}

impl Sin {
    #[must_use]
    pub fn value_at(&self, time: f64) -> f64 {
        if time < self.delay {
            return self.offset;
        }
        let t = time - self.delay;
        let phase = std::f64::consts::TAU * self.frequency * t
            + self.phase_deg.to_radians();
        self.offset + self.amplitude * (-self.theta * t).exp() * phase.sin()
    }

    #[must_use]
    pub fn breakpoints(&self, _upto: f64) -> Vec<f64> {
        vec![self.delay]
    }
}

/// A double-exponential pulse (rising then falling exponential).
#[derive(Debug, Clone, PartialEq)]
pub struct Exp {
    pub initial_value: f64,
    pub pulsed_value: f64,
    pub rise_delay: f64,
    pub rise_tau: f64,
    pub fall_delay: f64,
    pub fall_tau: f64,
}

impl Exp {
    #[must_use]
    pub fn value_at(&self, time: f64) -> f64 {
        if time < self.rise_delay {
            return self.initial_value;
        }
        if time < self.fall_delay {
            return self.initial_value
                + (self.pulsed_value - self.initial_value)
                    * (1.0 - (-(time - self.rise_delay) / self.rise_tau).exp());
        }
        let risen = self.initial_value
            + (self.pulsed_value - self.initial_value)
                * (1.0 - (-(self.fall_delay - self.rise_delay) / self.rise_tau).exp());
        risen
            + (self.initial_value - risen)
                * (1.0 - (-(time - self.fall_delay) / self.fall_tau).exp())
    }

    #[must_use]
    pub fn breakpoints(&self, _upto: f64) -> Vec<f64> {
        vec![self.rise_delay, self.fall_delay]
    }
}

/// Piecewise-linear waveform given as (time, value) pairs, sorted by time.
#[derive(Debug, Clone, PartialEq)]
pub struct Pwl {
    pub points: Vec<(f64, f64)>,
}

impl Pwl {
    #[must_use]
    pub fn value_at(&self, time: f64) -> f64 {
        let points = &self.points;
        if points.is_empty() {
            return 0.0;
        }
        if time <= points[0].0 {
            return points[0].1;
        }
        if time >= points[points.len() - 1].0 {
            return points[points.len() - 1].1;
        }
        let segment = points
            .windows(2)
            .find(|w| time >= w[0].0 && time <= w[1].0)
            .expect("time lies within the PWL range checked above");
        let (t0, v0) = segment[0];
        let (t1, v1) = segment[1];
        if (t1 - t0).abs() < f64::EPSILON {
            v1
        } else {
            v0 + (v1 - v0) * (time - t0) / (t1 - t0)
        }
    }

    #[must_use]
    pub fn breakpoints(&self, upto: f64) -> Vec<f64> {
        self.points
            .iter()
            .map(|&(t, _)| t)
            .filter(|&t| t <= upto)
            .collect()
    }
}

/// Single-frequency FM waveform.
#[derive(Debug, Clone, PartialEq)]
pub struct Sffm {
    pub offset: f64,
    pub amplitude: f64,
    pub carrier_frequency: f64,
    pub modulation_index: f64,
    pub signal_frequency: f64,
}

impl Sffm {
    #[must_use]
    pub fn value_at(&self, time: f64) -> f64 {
        let tau = std::f64::consts::TAU;
        self.offset
            + self.amplitude
                * (tau * self.carrier_frequency * time
                    + self.modulation_index * (tau * self.signal_frequency * time).sin())
                    .sin()
    }

    #[must_use]
    pub fn breakpoints(&self, _upto: f64) -> Vec<f64> {
        Vec::new()
    }
}

/// The time-domain behaviour of an independent source. DC analyses use a
/// plain scalar; transient analyses evaluate one of these variants.
#[derive(Debug, Clone, PartialEq)]
pub enum Waveform {
    Pulse(Pulse),
    Sin(Sin),
    Exp(Exp),
    Pwl(Pwl),
    Sffm(Sffm),
}

impl Waveform {
    #[must_use]
    pub fn value_at(&self, time: f64) -> f64 {
        match self {
            Waveform::Pulse(p) => p.value_at(time),
            Waveform::Sin(s) => s.value_at(time),
            Waveform::Exp(e) => e.value_at(time),
            Waveform::Pwl(p) => p.value_at(time),
            Waveform::Sffm(s) => s.value_at(time),
        }
    }

    /// Breakpoint times (edges / segment boundaries) up to `upto` seconds
    /// that the transient driver must land a step on exactly.
    #[must_use]
    pub fn breakpoints(&self, upto: f64) -> Vec<f64> {
        match self {
            Waveform::Pulse(p) => p.breakpoints(upto),
            Waveform::Sin(s) => s.breakpoints(upto),
            Waveform::Exp(e) => e.breakpoints(upto),
            Waveform::Pwl(p) => p.breakpoints(upto),
            Waveform::Sffm(s) => s.breakpoints(upto),
        }
    }
}
