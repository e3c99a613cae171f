//! Greed and rebellion-risk scoring.
//!
//! Greed measures how much of the village's power the player is sitting
//! on. Rebellion risk turns that into a per-villager pressure: a greedy
//! player hurts most the villagers whose own pools are emptiest.

/// Player share of all power in circulation, in `[0, 1]`.
///
/// Returns 0 when no power is in circulation.
pub const fn greed_score(player_power: u32, total_power: u32) -> f32 {
    if total_power == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss, reason = "power totals stay far below 2^24")]
    let share = player_power as f32 / total_power as f32;
    share.clamp(0.0, 1.0)
}

/// Rebellion pressure on one holder, in `[0, 1]`.
///
/// ```text
/// risk = max(0, greed - threshold) / (1 - threshold) * (1 - fill_ratio)
/// ```
///
/// Greed at or below `threshold` produces no risk. A threshold of 1 or
/// more disables the score entirely.
pub const fn rebellion_risk(greed: f32, threshold: f32, fill_ratio: f32) -> f32 {
    let headroom = 1.0 - threshold;
    if headroom <= 0.0 {
        return 0.0;
    }
    let excess = (greed - threshold).max(0.0) / headroom;
    let deprivation = 1.0 - fill_ratio.clamp(0.0, 1.0);
    (excess * deprivation).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn greed_is_player_share() {
        assert!(close(greed_score(5, 20), 0.25));
        assert!(close(greed_score(0, 0), 0.0));
        assert!(close(greed_score(20, 20), 1.0));
    }

    #[test]
    fn no_risk_below_threshold() {
        assert!(close(rebellion_risk(0.4, 0.5, 0.0), 0.0));
    }

    #[test]
    fn risk_scales_with_excess_and_deprivation() {
        // excess = (0.75 - 0.5) / 0.5 = 0.5, deprivation = 1 - 0.5 = 0.5
        assert!(close(rebellion_risk(0.75, 0.5, 0.5), 0.25));
        // A full pool shields the holder entirely.
        assert!(close(rebellion_risk(1.0, 0.5, 1.0), 0.0));
    }

    #[test]
    fn degenerate_threshold_disables_risk() {
        assert!(close(rebellion_risk(1.0, 1.0, 0.0), 0.0));
    }
}
