use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// The fixed set of things the detector knows how to look for.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Display,
  EnumIter,
  EnumString,
  Serialize,
  Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Category {
  #[default]
  Matcha,
  Labubu,
  Tote,
  Performative,
}

/// Everything that has to stay in lockstep for one category: the keyword the
/// fallback heuristic looks for, the name of the primary flag in the reply,
/// the optional score fields, and the prompt that asks for all of them.
#[derive(Debug)]
pub struct CategoryProfile {
  pub category: Category,
  pub keyword: &'static str,
  pub flag_field: &'static str,
  pub score_fields: &'static [&'static str],
  pub prompt: &'static str,
}

const MATCHA_PROMPT: &str = r#"Please analyze this image and determine if it contains matcha (the Japanese green tea powder). Look for:

1. The distinctive bright green color of matcha
2. Matcha-flavored foods, drinks, or desserts (matcha latte, matcha ice cream, matcha cake, etc.)
3. Matcha powder itself
4. Any matcha-related items

Respond ONLY with a valid JSON object (no markdown formatting, no extra text) containing:
- isMatcha: boolean (true if matcha is detected)
- confidence: number (0-100, your confidence percentage)
- explanation: string (detailed explanation of what you see and why you think it contains/doesn't contain matcha)

Be specific about what matcha-related elements you can identify in the image."#;

const LABUBU_PROMPT: &str = r#"Please analyze this image and determine if it contains a Labubu (the Pop Mart collectible monster figure with pointed ears and a toothy grin). Look for:

1. Labubu plush figures, keychains, or bag charms
2. Pop Mart blind box packaging or collections featuring Labubu
3. Labubu clipped to handbags or designer accessories
4. Counterfeit or look-alike Labubu figures ("Lafufu")

Respond ONLY with a valid JSON object (no markdown formatting, no extra text) containing:
- isLabubu: boolean (true if a Labubu is detected)
- confidence: number (0-100, your confidence percentage)
- explanation: string (detailed explanation of what you see and why you think it is or isn't a Labubu)

Be specific about which Labubu features you can identify in the image."#;

const TOTE_PROMPT: &str = r#"Please analyze this image and determine if it contains a tote bag. Look for:

1. An open-top bag with two parallel handles
2. Canvas, cotton, jute, or other fabric carriers
3. Branded or designer totes and merchandise bags
4. Reusable shopping or eco-friendly carriers

Respond ONLY with a valid JSON object (no markdown formatting, no extra text) containing:
- isTote: boolean (true if a tote bag is detected)
- confidence: number (0-100, your confidence percentage)
- explanation: string (detailed explanation of what you see and why you think it is or isn't a tote bag)
- sustainability: number (0-100, how eco-friendly the bag appears)
- brandValue: number (0-100, how much brand prestige the bag signals)
- aestheticScore: number (0-100, how visually curated the bag looks)

Be specific about the material, branding, and styling you can identify in the image."#;

const PERFORMATIVE_PROMPT: &str = r#"Please analyze this image and determine if it shows a "performative male" as described by 2025 TikTok culture. Look for:

1. Props such as matcha drinks, tote bags, Labubu charms, wired headphones, or film cameras
2. Carefully curated looksmaxxing or "soft boy" aesthetics
3. Books, vinyl records, or other items displayed for the camera
4. Poses and settings that look staged for social media

Respond ONLY with a valid JSON object (no markdown formatting, no extra text) containing:
- isPerformative: boolean (true if the image shows performative male indicators)
- confidence: number (0-100, your confidence percentage)
- explanation: string (detailed explanation of what you see and why)
- performativeScore: number (0-100, how performative the overall scene is)
- sigmaLevel: string (one of "alpha", "beta", "sigma", "omega")
- tiktokFactor: number (0-100, how TikTok-ready the image is)
- detectedItems: array of strings (each performative item you can identify)

Be specific about which items and styling choices you can identify in the image."#;

static PROFILES: [CategoryProfile; 4] = [
  CategoryProfile {
    category: Category::Matcha,
    keyword: "matcha",
    flag_field: "isMatcha",
    score_fields: &[],
    prompt: MATCHA_PROMPT,
  },
  CategoryProfile {
    category: Category::Labubu,
    keyword: "labubu",
    flag_field: "isLabubu",
    score_fields: &[],
    prompt: LABUBU_PROMPT,
  },
  CategoryProfile {
    category: Category::Tote,
    keyword: "tote",
    flag_field: "isTote",
    score_fields: &["sustainability", "brandValue", "aestheticScore"],
    prompt: TOTE_PROMPT,
  },
  CategoryProfile {
    category: Category::Performative,
    keyword: "performative",
    flag_field: "isPerformative",
    score_fields: &["performativeScore", "tiktokFactor"],
    prompt: PERFORMATIVE_PROMPT,
  },
];

impl Category {
  /// Resolve a category from an out-of-band selector such as the
  /// `X-Model-Type` header. Anything missing or unknown selects matcha.
  pub fn from_selector(selector: Option<&str>) -> Self {
    selector
      .map(str::trim)
      .and_then(|s| Category::from_str(s).ok())
      .unwrap_or_default()
  }

  pub fn profile(self) -> &'static CategoryProfile {
    match self {
      Category::Matcha => &PROFILES[0],
      Category::Labubu => &PROFILES[1],
      Category::Tote => &PROFILES[2],
      Category::Performative => &PROFILES[3],
    }
  }

  pub fn prompt(self) -> &'static str {
    self.profile().prompt
  }

  pub fn all() -> impl Iterator<Item = Category> {
    Category::iter()
  }
}
