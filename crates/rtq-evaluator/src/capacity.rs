use rtq_abstract::{Phase, Sample, Series};
use rtq_core::step_expand;

/// Stair-step link rate of the phase schedule, in bit/s over milliseconds.
///
/// Each phase starts where the previous one ended; a phase with zero
/// duration holds until the end of the run. The last rate is held until
/// `end_ms` when that lies past the last phase start.
pub fn link_capacity(phases: &[Phase], end_ms: i64) -> Series<i64> {
    let mut points = Series::new();
    let mut start = 0_i64;
    for phase in phases {
        points.push(Sample::new(start, phase.config.bitrate as f64));
        if phase.duration.is_zero() {
            break;
        }
        start = start.saturating_add(phase.duration.as_millis() as i64);
    }

    if let Some(last) = points.last().copied()
        && end_ms > last.key
    {
        points.push(Sample::new(end_ms, last.value));
    }
    step_expand(&points)
}
