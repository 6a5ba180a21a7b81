//! Persona building: [`RawSignals`] (+ optional mood observation) → [`PersonaSnapshot`].
//!
//! Trait mapping is threshold-based. The builder never fails; signals that
//! do not validate are swapped for [`RawSignals::fallback`] and the result
//! carries a capped, low confidence.

use serde::Serialize;

use super::signals::{self, extract_signals};
use super::types::{
    Archetype, ContentItem, Intensity, MoodObservation, Pacing, PersonaSnapshot, RawSignals,
    RiskProfile, SessionLength, SocialStyle,
};

/// Confidence ceiling for personas built from fallback signals.
pub const FALLBACK_CONFIDENCE: f64 = 0.1;

/// Observations at or above this confidence override the derived intensity.
const OBSERVATION_OVERRIDE_CONFIDENCE: f64 = 0.7;

/// Category keywords counted as competitive playtime.
const COMPETITIVE_KEYWORDS: &[&str] = &[
    "competitive",
    "pvp",
    "fighting",
    "shooter",
    "esports",
    "battle royale",
    "ranked",
];

/// Items and sessions at which each half of the confidence saturates.
const CONFIDENCE_ITEMS: f64 = 20.0;
const CONFIDENCE_SESSIONS: f64 = 50.0;

const MAX_DOMINANT_MOODS: usize = 3;

/// Signals together with the persona built from them.
#[derive(Debug, Clone, Serialize)]
pub struct PersonaProfile {
    pub signals: RawSignals,
    pub persona: PersonaSnapshot,
    /// True when extraction produced unusable signals and defaults were used.
    pub fallback_used: bool,
}

/// Extract signals from `items` and build a persona, falling back to neutral
/// signals if extraction produces anything unusable.
pub fn build_profile(
    items: &[ContentItem],
    session_override: Option<SessionLength>,
    observation: Option<&MoodObservation>,
) -> PersonaProfile {
    let extracted = extract_signals(items, session_override);
    profile_from_signals(extracted, observation)
}

/// Build a persona from already-extracted signals, substituting the neutral
/// fallback when they do not validate.
pub fn profile_from_signals(
    extracted: RawSignals,
    observation: Option<&MoodObservation>,
) -> PersonaProfile {
    match signals::validate(&extracted) {
        Ok(()) => {
            let persona = build_persona(&extracted, observation);
            PersonaProfile {
                signals: extracted,
                persona,
                fallback_used: false,
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "signal extraction failed, using fallback signals");
            let fallback = RawSignals::fallback();
            let mut persona = build_persona(&fallback, observation);
            persona.confidence = persona.confidence.min(FALLBACK_CONFIDENCE);
            PersonaProfile {
                signals: fallback,
                persona,
                fallback_used: true,
            }
        }
    }
}

/// Map signals onto the persona trait vector.
pub fn build_persona(signals: &RawSignals, observation: Option<&MoodObservation>) -> PersonaSnapshot {
    let pacing = pacing_for(signals.average_session_minutes);
    let social_style = social_style_for(signals);
    let risk_profile = risk_profile_for(signals);

    let mut intensity = intensity_for(signals);
    if let Some(obs) = observation {
        if obs.confidence >= OBSERVATION_OVERRIDE_CONFIDENCE {
            intensity = obs.intensity;
        }
    }

    let archetype = archetype_for(signals, pacing, social_style, risk_profile);

    PersonaSnapshot {
        archetype,
        intensity,
        pacing,
        social_style,
        risk_profile,
        dominant_moods: dominant_moods(signals, observation),
        confidence: confidence_for(signals),
    }
}

pub fn pacing_for(average_session_minutes: f64) -> Pacing {
    if average_session_minutes < 45.0 {
        Pacing::Burst
    } else if average_session_minutes <= 90.0 {
        Pacing::Flow
    } else {
        Pacing::Marathon
    }
}

fn social_style_for(signals: &RawSignals) -> SocialStyle {
    if signals.multiplayer_ratio <= 0.5 {
        return SocialStyle::Solo;
    }
    if competitive_share(signals) >= 0.3 {
        SocialStyle::Competitive
    } else {
        SocialStyle::Coop
    }
}

fn competitive_share(signals: &RawSignals) -> f64 {
    let total = signals.total_playtime_hours();
    if total <= 0.0 {
        return 0.0;
    }
    let competitive: f64 = signals
        .playtime_by_category
        .iter()
        .filter(|(category, _)| COMPETITIVE_KEYWORDS.iter().any(|k| category.contains(k)))
        .map(|(_, hours)| hours)
        .sum();
    (competitive / total).clamp(0.0, 1.0)
}

/// Weekly minutes: under 3h is low, under 10h medium.
fn intensity_for(signals: &RawSignals) -> Intensity {
    let weekly_minutes = signals.sessions_per_week as f64 * signals.average_session_minutes;
    if weekly_minutes < 180.0 {
        Intensity::Low
    } else if weekly_minutes < 600.0 {
        Intensity::Medium
    } else {
        Intensity::High
    }
}

fn risk_profile_for(signals: &RawSignals) -> RiskProfile {
    let total = signals.total_playtime_hours();
    if total <= 0.0 {
        return RiskProfile::Balanced;
    }
    let diversity = signals
        .playtime_by_category
        .values()
        .filter(|hours| **hours / total >= 0.1)
        .count();

    if diversity >= 4 && signals.completion_rate < 0.5 {
        RiskProfile::Explorer
    } else if diversity <= 1 {
        RiskProfile::Comfort
    } else {
        RiskProfile::Balanced
    }
}

fn archetype_for(
    signals: &RawSignals,
    pacing: Pacing,
    social_style: SocialStyle,
    risk_profile: RiskProfile,
) -> Archetype {
    match (social_style, pacing, risk_profile) {
        (SocialStyle::Competitive, _, _) => Archetype::Competitor,
        (SocialStyle::Coop, _, _) => Archetype::SocialButterfly,
        _ if signals.completion_rate >= 0.6 && signals.item_count >= 3 => Archetype::Completionist,
        (_, Pacing::Marathon, _) => Archetype::Marathoner,
        (_, _, RiskProfile::Explorer) => Archetype::Explorer,
        (_, Pacing::Burst, _) => Archetype::Snacker,
        _ => Archetype::Wanderer,
    }
}

/// More items and more sessions mean more confidence, capped at 1.0.
pub fn confidence_for(signals: &RawSignals) -> f64 {
    let items = (signals.item_count as f64 / CONFIDENCE_ITEMS).min(1.0);
    let sessions = (signals.total_sessions as f64 / CONFIDENCE_SESSIONS).min(1.0);
    (0.6 * items + 0.4 * sessions).clamp(0.0, 1.0)
}

/// Top moods by playtime (ties by name). An observed mood leads the list.
pub fn dominant_moods(signals: &RawSignals, observation: Option<&MoodObservation>) -> Vec<String> {
    let mut ranked: Vec<(&String, f64)> = signals
        .mood_distribution
        .iter()
        .map(|(mood, hours)| (mood, *hours))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let mut moods: Vec<String> = ranked.into_iter().map(|(m, _)| m.clone()).collect();

    if let Some(obs) = observation {
        let observed = obs.mood.trim().to_lowercase();
        if !observed.is_empty() {
            moods.retain(|m| *m != observed);
            moods.insert(0, observed);
        }
    }

    moods.truncate(MAX_DOMINANT_MOODS);
    moods
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn signals_with(avg: f64, spw: u32, multiplayer: f64) -> RawSignals {
        RawSignals {
            average_session_minutes: avg,
            sessions_per_week: spw,
            multiplayer_ratio: multiplayer,
            ..RawSignals::fallback()
        }
    }

    #[test]
    fn test_empty_library_builds_low_confidence_persona() {
        let profile = build_profile(&[], None, None);
        assert!(!profile.fallback_used);
        assert!(profile.persona.confidence <= FALLBACK_CONFIDENCE);
        assert_eq!(profile.persona.pacing, Pacing::Flow);
        assert_eq!(profile.persona.social_style, SocialStyle::Solo);
    }

    #[test]
    fn test_invalid_signals_fall_back() {
        let mut broken = RawSignals::fallback();
        broken.item_count = 40;
        broken.total_sessions = 100;
        broken.multiplayer_ratio = f64::NAN;

        let profile = profile_from_signals(broken, None);
        assert!(profile.fallback_used);
        assert_eq!(profile.signals, RawSignals::fallback());
        assert!(profile.persona.confidence <= FALLBACK_CONFIDENCE);
    }

    #[test]
    fn test_pacing_thresholds() {
        assert_eq!(pacing_for(30.0), Pacing::Burst);
        assert_eq!(pacing_for(45.0), Pacing::Flow);
        assert_eq!(pacing_for(90.0), Pacing::Flow);
        assert_eq!(pacing_for(91.0), Pacing::Marathon);
    }

    #[test]
    fn test_social_style_solo_coop_competitive() {
        let solo = build_persona(&signals_with(60.0, 3, 0.5), None);
        assert_eq!(solo.social_style, SocialStyle::Solo);

        let mut coop = signals_with(60.0, 3, 0.8);
        coop.playtime_by_category = BTreeMap::from([("co-op".into(), 10.0), ("farming".into(), 10.0)]);
        assert_eq!(build_persona(&coop, None).social_style, SocialStyle::Coop);
        assert_eq!(build_persona(&coop, None).archetype, Archetype::SocialButterfly);

        let mut competitive = coop.clone();
        competitive
            .playtime_by_category
            .insert("competitive shooter".into(), 20.0);
        let persona = build_persona(&competitive, None);
        assert_eq!(persona.social_style, SocialStyle::Competitive);
        assert_eq!(persona.archetype, Archetype::Competitor);
    }

    #[test]
    fn test_intensity_from_weekly_minutes() {
        assert_eq!(build_persona(&signals_with(30.0, 3, 0.0), None).intensity, Intensity::Low);
        assert_eq!(build_persona(&signals_with(60.0, 4, 0.0), None).intensity, Intensity::Medium);
        assert_eq!(build_persona(&signals_with(120.0, 7, 0.0), None).intensity, Intensity::High);
    }

    #[test]
    fn test_confident_observation_overrides_intensity_and_leads_moods() {
        let mut signals = signals_with(30.0, 3, 0.0);
        signals.mood_distribution = BTreeMap::from([
            ("story".into(), 10.0),
            ("chill".into(), 5.0),
            ("creative".into(), 1.0),
        ]);
        let obs = MoodObservation {
            mood: "Competitive".into(),
            intensity: Intensity::High,
            confidence: 0.9,
            observed_at: Utc::now(),
        };
        let persona = build_persona(&signals, Some(&obs));
        assert_eq!(persona.intensity, Intensity::High);
        assert_eq!(persona.dominant_moods, vec!["competitive", "story", "chill"]);

        let weak = MoodObservation { confidence: 0.2, ..obs };
        assert_eq!(build_persona(&signals, Some(&weak)).intensity, Intensity::Low);
    }

    #[test]
    fn test_dominant_mood_ties_break_by_name() {
        let mut signals = RawSignals::fallback();
        signals.mood_distribution = BTreeMap::from([
            ("story".into(), 5.0),
            ("adventure".into(), 5.0),
            ("chill".into(), 9.0),
            ("social".into(), 1.0),
        ]);
        assert_eq!(dominant_moods(&signals, None), vec!["chill", "adventure", "story"]);
    }

    #[test]
    fn test_confidence_saturates() {
        let mut signals = RawSignals::fallback();
        signals.item_count = 200;
        signals.total_sessions = 500;
        assert_eq!(confidence_for(&signals), 1.0);
        signals.item_count = 10;
        signals.total_sessions = 0;
        assert!((confidence_for(&signals) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_risk_profile() {
        let mut signals = RawSignals::fallback();
        signals.playtime_by_category = BTreeMap::from([("rpg".into(), 50.0)]);
        assert_eq!(build_persona(&signals, None).risk_profile, RiskProfile::Comfort);

        signals.playtime_by_category = BTreeMap::from([
            ("rpg".into(), 10.0),
            ("puzzle".into(), 10.0),
            ("racing".into(), 10.0),
            ("strategy".into(), 10.0),
        ]);
        let persona = build_persona(&signals, None);
        assert_eq!(persona.risk_profile, RiskProfile::Explorer);
        assert_eq!(persona.archetype, Archetype::Explorer);
    }

    #[test]
    fn test_archetype_completionist_and_marathoner() {
        let mut signals = signals_with(120.0, 3, 0.0);
        signals.item_count = 5;
        signals.completion_rate = 0.8;
        assert_eq!(build_persona(&signals, None).archetype, Archetype::Completionist);
        signals.completion_rate = 0.1;
        assert_eq!(build_persona(&signals, None).archetype, Archetype::Marathoner);
        signals.average_session_minutes = 20.0;
        assert_eq!(build_persona(&signals, None).archetype, Archetype::Snacker);
    }
}
