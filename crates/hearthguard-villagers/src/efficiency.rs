//! Combat efficiency from food and morale.

use hearthguard_types::VillagerState;

use crate::config::EfficiencyConfig;

/// Combat multiplier in `(0, 1]`.
///
/// ```text
/// food_factor  = 1                                              if food >= threshold
///              = floor + (1 - floor) * food / threshold         otherwise
/// state_factor = angry_multiplier if Angry, else 1
/// efficiency   = food_factor * state_factor
/// ```
///
/// Rebels always fight at full efficiency.
pub fn combat_efficiency(food: f32, state: VillagerState, config: &EfficiencyConfig) -> f32 {
    if state == VillagerState::Rebel {
        return 1.0;
    }
    let food = food.clamp(0.0, 1.0);
    let food_factor = if food >= config.food_threshold || config.food_threshold <= 0.0 {
        1.0
    } else {
        let t = food / config.food_threshold;
        (1.0 - config.low_food_floor).mul_add(t, config.low_food_floor)
    };
    let state_factor = if state == VillagerState::Angry {
        config.angry_multiplier
    } else {
        1.0
    };
    food_factor * state_factor
}
