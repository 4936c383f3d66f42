use crate::domains::chat::{Message, Role};

const POSITIVE_INDICATORS: [&str; 5] = ["fascinating", "exciting", "wonderful", "enjoy", "love"];
const NEGATIVE_INDICATORS: [&str; 4] = ["unfortunately", "sadly", "difficult", "challenging"];
const NEUTRAL_INDICATORS: [&str; 4] = ["consider", "analyze", "examine", "evaluate"];
const CREATIVE_INDICATORS: [&str; 7] = [
    "imagine", "envision", "create", "design", "innovative", "novel", "unique",
];

/// Scores are unit-ranged; valence runs negative for gloomy text.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResponseAnalysis {
    pub cognitive_load: f64,
    pub emotional_valence: f64,
    pub creative_flow: f64,
    pub word_count: usize,
}

// Indicator matching is plain substring counting on the lowercased
// text, so "created" counts toward "create".
pub fn analyze(content: &str) -> ResponseAnalysis {
    if content.trim().is_empty() {
        return ResponseAnalysis::default();
    }
    let lowercase = content.to_lowercase();
    let word_count = content.split_whitespace().count();

    let positive = count_terms(&lowercase, &POSITIVE_INDICATORS);
    let negative = count_terms(&lowercase, &NEGATIVE_INDICATORS);
    let neutral = count_terms(&lowercase, &NEUTRAL_INDICATORS);
    let creative = count_terms(&lowercase, &CREATIVE_INDICATORS);

    let total = (positive + negative + neutral).max(1);
    ResponseAnalysis {
        cognitive_load: (word_count as f64 / 50.0).min(1.0),
        emotional_valence: (positive as f64 - negative as f64) / total as f64,
        creative_flow: (creative as f64 / 10.0).min(1.0),
        word_count,
    }
}

/// Only the newest message counts, and only while the assistant holds
/// the floor; anything else reads as idle.
pub fn analyze_latest(messages: &[Message]) -> ResponseAnalysis {
    messages
        .last()
        .filter(|message| message.role == Role::Assistant)
        .map(|message| analyze(&message.content))
        .unwrap_or_default()
}

fn count_terms(text: &str, terms: &[&str]) -> usize {
    terms.iter().map(|term| text.matches(term).count()).sum()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderParams {
    pub complexity: f64,
    pub pulse_rate: f64,
    pub surface_tension: f64,
    pub luminescence: f64,
    pub iridescence: f64,
    pub rotation: f64,
    pub fluidity: f64,
    pub symmetry: f64,
    pub transparency: f64,
}

pub fn render_params(analysis: &ResponseAnalysis) -> RenderParams {
    RenderParams {
        complexity: 0.5 + analysis.cognitive_load * 0.5,
        pulse_rate: 0.3 + analysis.cognitive_load * 0.3,
        surface_tension: 0.7 - analysis.cognitive_load * 0.4,
        luminescence: 0.6 + analysis.emotional_valence * 0.4,
        iridescence: 0.5 + analysis.cognitive_load * 0.3,
        rotation: 0.0,
        fluidity: 0.5 + analysis.cognitive_load * 0.1,
        symmetry: 0.7,
        transparency: 0.6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::chat::Role;

    fn message(role: Role, content: &str) -> Message {
        Message {
            id: "m1".to_string(),
            chat_id: "c1".to_string(),
            role,
            content: content.to_string(),
            timestamp: 0,
        }
    }

    #[test]
    fn empty_content_reads_as_idle() {
        let analysis = analyze("   \n ");
        assert_eq!(analysis, ResponseAnalysis::default());
        assert_eq!(analysis.word_count, 0);
    }

    #[test]
    fn valence_balances_positive_against_negative() {
        let analysis = analyze("This is fascinating and wonderful, though sadly difficult.");
        assert_eq!(analysis.word_count, 8);
        assert_eq!(analysis.emotional_valence, 0.0);
        assert_eq!(analysis.cognitive_load, 8.0 / 50.0);

        let upbeat = analyze("I love this fascinating topic");
        assert!(upbeat.emotional_valence > 0.9);

        let gloomy = analyze("unfortunately this is difficult");
        assert!(gloomy.emotional_valence < 0.0);
    }

    #[test]
    fn creative_terms_raise_flow() {
        let analysis = analyze("imagine a novel design, unique and innovative");
        assert_eq!(analysis.creative_flow, 5.0 / 10.0);
    }

    #[test]
    fn long_text_saturates_cognitive_load() {
        let text = "word ".repeat(80);
        let analysis = analyze(&text);
        assert_eq!(analysis.cognitive_load, 1.0);
        assert_eq!(analysis.word_count, 80);
    }

    #[test]
    fn latest_message_counts_only_when_assistant() {
        let timeline = vec![
            message(Role::User, "hello there"),
            message(Role::Assistant, "a fascinating question"),
        ];
        let analysis = analyze_latest(&timeline);
        assert!(analysis.word_count > 0);

        let timeline = vec![
            message(Role::Assistant, "a fascinating question"),
            message(Role::User, "hello there"),
        ];
        assert_eq!(analyze_latest(&timeline), ResponseAnalysis::default());
        assert_eq!(analyze_latest(&[]), ResponseAnalysis::default());
    }

    #[test]
    fn render_params_track_the_analysis() {
        let idle = render_params(&ResponseAnalysis::default());
        assert_eq!(idle.complexity, 0.5);
        assert_eq!(idle.luminescence, 0.6);
        assert_eq!(idle.symmetry, 0.7);

        let busy = render_params(&analyze(&"word ".repeat(100)));
        assert_eq!(busy.complexity, 1.0);
        assert_eq!(busy.pulse_rate, 0.6);
        assert_eq!(busy.surface_tension, 0.7 - 0.4);
    }
}
