use serde::{de, Deserialize, Deserializer, Serialize};
use serde_with::{serde_as, DisplayFromStr, NoneAsEmptyString, PickFirst};
use std::{fmt, str::FromStr};

/// Number of outfits requested from the model and expected back.
pub const SUGGESTION_COUNT: usize = 3;

macro_rules! form_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name { $($variant),+ }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self { $(Self::$variant => $wire),+ }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
        }

        impl FromStr for $name {
            type Err = String;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($wire => Ok(Self::$variant),)+
                    other => Err(format!("unknown {} value: {other}", stringify!($name))),
                }
            }
        }
    };
}

form_enum!(
    /// Body build as picked in the profile form.
    Build { Slim => "delgada", Athletic => "atletica", Average => "media", Sturdy => "robusta" }
);

form_enum!(
    Fit { Oversized => "oversized", SemiFormal => "semiformal", Structured => "estructurada", Flowing => "fluida", Fitted => "al-cuerpo" }
);

form_enum!(TimeOfDay { Day => "dia", Night => "noche" });

form_enum!(Location { Indoor => "interior", Outdoor => "exterior" });

#[serde_as]
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub gender: Option<String>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub build: Option<Build>,
    /// Kept in selection order.
    #[serde(default)]
    pub styles: Vec<String>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub fit: Option<Fit>,
}

#[serde_as]
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub description: Option<String>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub time_of_day: Option<TimeOfDay>,
    /// Estimated temperature in °C.
    #[serde(default, rename = "weather", deserialize_with = "deserialize_temperature")]
    pub temperature: Option<f64>,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    pub location: Option<Location>,
}

// The form posts the temperature as whatever the input held: a number, a
// numeric string, or "" when left blank.
fn deserialize_temperature<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid temperature: {s}"))),
    }
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    /// Models occasionally quote the id.
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub id: u32,
    pub title: String,
    pub description: String,
    pub search_query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageResult {
    pub image_url: String,
    pub thumb_url: String,
    pub photographer: String,
    pub photographer_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrichedSuggestion {
    #[serde(flatten)]
    pub suggestion: Suggestion,
    #[serde(flatten)]
    pub image: ImageResult,
}

// --- Wire DTOs ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub profile: Profile,
    #[serde(default)]
    pub event: Event,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuggestionsResponse {
    pub outfits: Vec<Suggestion>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageSearchRequest {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(default)]
    pub plan_id: String,
    #[serde(default)]
    pub user_email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn empty_form_fields_are_absent() {
        let req: GenerateRequest = serde_json::from_value(json!({
            "profile": { "gender": "", "build": "", "styles": [], "fit": "" },
            "event": { "description": "", "timeOfDay": "", "weather": "", "location": "" }
        }))
        .unwrap();
        assert_eq!(req.profile, Profile::default());
        assert_eq!(req.event, Event::default());
    }

    #[test]
    fn filled_form_decodes_enums_and_temperature() {
        let req: GenerateRequest = serde_json::from_value(json!({
            "profile": { "gender": "mujer", "build": "atletica", "styles": ["Casual", "Elegante"], "fit": "al-cuerpo" },
            "event": { "description": "Boda en la playa", "timeOfDay": "noche", "weather": "24", "location": "exterior" }
        }))
        .unwrap();
        assert_eq!(req.profile.build, Some(Build::Athletic));
        assert_eq!(req.profile.fit, Some(Fit::Fitted));
        assert_eq!(req.profile.styles, vec!["Casual", "Elegante"]);
        assert_eq!(req.event.time_of_day, Some(TimeOfDay::Night));
        assert_eq!(req.event.temperature, Some(24.0));
        assert_eq!(req.event.location, Some(Location::Outdoor));
    }

    #[test]
    fn numeric_temperature_and_missing_sections() {
        let req: GenerateRequest = serde_json::from_value(json!({ "event": { "weather": 18.5 } })).unwrap();
        assert_eq!(req.event.temperature, Some(18.5));
        assert_eq!(req.profile, Profile::default());
    }

    #[test]
    fn unknown_enum_value_is_rejected() {
        let res = serde_json::from_value::<Profile>(json!({ "build": "gigante" }));
        assert!(res.is_err());
    }

    #[test]
    fn suggestion_accepts_quoted_id() {
        let s: Suggestion = serde_json::from_value(json!({
            "id": "2", "title": "t", "description": "d", "searchQuery": "q"
        }))
        .unwrap();
        assert_eq!(s.id, 2);
    }

    #[test]
    fn enriched_suggestion_serializes_flat() {
        let e = EnrichedSuggestion {
            suggestion: Suggestion { id: 1, title: "t".into(), description: "d".into(), search_query: "q".into() },
            image: ImageResult {
                image_url: "i".into(),
                thumb_url: "th".into(),
                photographer: "p".into(),
                photographer_url: "pu".into(),
            },
        };
        assert_eq!(
            serde_json::to_value(&e).unwrap(),
            json!({
                "id": 1, "title": "t", "description": "d", "searchQuery": "q",
                "imageUrl": "i", "thumbUrl": "th", "photographer": "p", "photographerUrl": "pu"
            })
        );
    }
}
