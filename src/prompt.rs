use crate::models::{Event, Profile, SUGGESTION_COUNT};

pub const NOT_SPECIFIED: &str = "not specified";

/// System turn sent alongside every prompt.
pub const SYSTEM_INSTRUCTION: &str =
    "You are an expert fashion stylist who answers only with valid JSON, without markdown or extra commentary.";

fn text_or_placeholder(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => NOT_SPECIFIED.to_string(),
    }
}

fn styles_line(styles: &[String]) -> String {
    let picked: Vec<&str> = styles.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).collect();
    if picked.is_empty() {
        NOT_SPECIFIED.to_string()
    } else {
        picked.join(", ")
    }
}

/// Renders profile and event into the stylist instruction. Total over all
/// inputs: absent fields render as [`NOT_SPECIFIED`].
pub fn build_prompt(profile: &Profile, event: &Event) -> String {
    let gender = text_or_placeholder(profile.gender.as_deref());
    let build = text_or_placeholder(profile.build.map(|b| b.as_str()));
    let styles = styles_line(&profile.styles);
    let fit = text_or_placeholder(profile.fit.map(|f| f.as_str()));

    let description = text_or_placeholder(event.description.as_deref());
    let time_of_day = text_or_placeholder(event.time_of_day.map(|t| t.as_str()));
    let temperature = event
        .temperature
        .filter(|t| t.is_finite())
        .map(|t| format!("{t}°C"))
        .unwrap_or_else(|| NOT_SPECIFIED.to_string());
    let location = text_or_placeholder(event.location.map(|l| l.as_str()));

    let schema_items: Vec<String> = (1..=SUGGESTION_COUNT)
        .map(|id| {
            format!(
                r#"    {{
      "id": {id},
      "title": "Short style name (e.g. Elegante Casual)",
      "description": "Detailed outfit description naming specific garments, colours and accessories. 2-3 sentences.",
      "searchQuery": "English search terms to find a similar photo on Unsplash (e.g. elegant casual outfit woman summer)"
    }}"#
            )
        })
        .collect();

    format!(
        "You are an expert fashion stylist. Based on the following profile and event, generate exactly {SUGGESTION_COUNT} different outfit suggestions. \
Write each title and description in Spanish; write each searchQuery in English.

USER PROFILE:
- Gender: {gender}
- Build: {build}
- Preferred styles: {styles}
- Fit preference: {fit}

EVENT:
- Description: {description}
- Time of day: {time_of_day}
- Estimated weather: {temperature}
- Location: {location}

Respond ONLY with a valid JSON object (no markdown, no additional explanations) with exactly {SUGGESTION_COUNT} items in the \"outfits\" array, using this format:
{{
  \"outfits\": [
{items}
  ]
}}",
        items = schema_items.join(",\n"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Build, Fit, Location, TimeOfDay};

    fn full_profile() -> Profile {
        Profile {
            gender: Some("mujer".into()),
            build: Some(Build::Slim),
            styles: vec!["Minimalista".into(), "Clásica".into(), "Casual".into()],
            fit: Some(Fit::Flowing),
        }
    }

    fn full_event() -> Event {
        Event {
            description: Some("Cena de aniversario".into()),
            time_of_day: Some(TimeOfDay::Night),
            temperature: Some(12.0),
            location: Some(Location::Indoor),
        }
    }

    #[test]
    fn empty_inputs_render_placeholders() {
        let prompt = build_prompt(&Profile::default(), &Event::default());
        assert!(prompt.contains("exactly 3"));
        assert!(prompt.contains("- Gender: not specified"));
        assert!(prompt.contains("- Preferred styles: not specified"));
        assert!(prompt.contains("- Estimated weather: not specified"));
        assert!(prompt.contains("- Location: not specified"));
    }

    #[test]
    fn whitespace_only_text_counts_as_missing() {
        let profile = Profile { gender: Some("   ".into()), styles: vec!["".into(), " ".into()], ..Profile::default() };
        let prompt = build_prompt(&profile, &Event::default());
        assert!(prompt.contains("- Gender: not specified"));
        assert!(prompt.contains("- Preferred styles: not specified"));
    }

    #[test]
    fn filled_inputs_render_in_order() {
        let prompt = build_prompt(&full_profile(), &full_event());
        assert!(prompt.contains("- Gender: mujer"));
        assert!(prompt.contains("- Build: delgada"));
        assert!(prompt.contains("- Preferred styles: Minimalista, Clásica, Casual"));
        assert!(prompt.contains("- Fit preference: fluida"));
        assert!(prompt.contains("- Description: Cena de aniversario"));
        assert!(prompt.contains("- Time of day: noche"));
        assert!(prompt.contains("- Estimated weather: 12°C"));
        assert!(prompt.contains("- Location: interior"));
    }

    #[test]
    fn schema_names_every_field() {
        let prompt = build_prompt(&full_profile(), &full_event());
        assert!(prompt.contains("\"outfits\""));
        for field in ["\"id\": 1", "\"id\": 2", "\"id\": 3", "\"title\"", "\"description\"", "\"searchQuery\""] {
            assert!(prompt.contains(field), "missing {field}");
        }
        assert!(!prompt.contains("\"id\": 4"));
    }

    #[test]
    fn partial_inputs_never_drop_the_count() {
        let events = [
            Event { temperature: Some(-2.5), ..Event::default() },
            Event { description: Some("Entrevista".into()), ..Event::default() },
            Event { temperature: Some(f64::NAN), ..Event::default() },
        ];
        for event in &events {
            let prompt = build_prompt(&Profile { fit: Some(Fit::Oversized), ..Profile::default() }, event);
            assert!(prompt.contains("exactly 3 different outfit suggestions"));
        }
        let cold = build_prompt(&Profile::default(), &events[0]);
        assert!(cold.contains("-2.5°C"));
        let nan = build_prompt(&Profile::default(), &events[2]);
        assert!(nan.contains("- Estimated weather: not specified"));
    }
}
