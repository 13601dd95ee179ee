use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::wire::{Selections, StepOption};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
}

const fn cat(id: &'static str, label: &'static str, description: &'static str) -> Category {
    Category { id, label, description }
}

/// Wizard steps in their fixed order.
pub const WIZARD_STEPS: [Category; 7] = [
    cat("subject", "Subject", "Choose the main subject of your image"),
    cat("details", "Details", "Add specific details about your subject"),
    cat("setting", "Setting", "Select where your scene takes place"),
    cat("style", "Style", "Choose an artistic style for your image"),
    cat("mood", "Mood", "Set the emotional tone of your image"),
    cat("elements", "Elements", "Add supporting elements to your scene"),
    cat("composition", "Composition", "Determine how elements are arranged"),
];

/// Categories offered by the tag-based builder.
pub const TAG_CATEGORIES: [Category; 8] = [
    cat("subject", "Subject", "What is the main focus of your image?"),
    cat("style", "Style", "What artistic style should the image have?"),
    cat("lighting", "Lighting", "How should the scene be lit?"),
    cat("composition", "Composition", "How should elements be arranged?"),
    cat("mood", "Mood", "What feeling or atmosphere should the image convey?"),
    cat("color", "Color", "What color palette should be used?"),
    cat("setting", "Setting", "Where does the scene take place?"),
    cat("time", "Time Period", "When does the scene take place?"),
];

type Entry = (&'static str, &'static str, &'static str);

// The first six entries of each pool are the stock options; the rest only
// surface on reroll.
const SUBJECT: &[Entry] = &[
    ("portrait", "Human Portrait", "A detailed portrait of a person"),
    ("landscape", "Landscape", "A scenic natural environment"),
    ("animal", "Animal", "A creature from the animal kingdom"),
    ("still-life", "Still Life", "An arrangement of inanimate objects"),
    ("architecture", "Architecture", "Buildings or architectural elements"),
    ("abstract", "Abstract", "Non-representational forms and patterns"),
    ("cityscape", "Cityscape", "A sprawling urban skyline"),
    ("fantasy-creature", "Fantasy Creature", "A mythical being from legend"),
    ("vehicle", "Vehicle", "Cars, ships, or flying machines"),
    ("food", "Food", "A carefully plated dish or its ingredients"),
];

const DETAILS: &[Entry] = &[
    ("intricate", "Intricate Details", "Complex and elaborate features"),
    ("minimalist", "Minimalist Details", "Simple, clean, and uncluttered"),
    ("textured", "Rich Textures", "Detailed surface patterns and textures"),
    ("weathered", "Weathered Look", "Showing signs of age and use"),
    ("ornate", "Ornate Decoration", "Elaborate and decorative elements"),
    ("geometric", "Geometric Patterns", "Regular shapes and mathematical forms"),
    ("glowing", "Glowing Accents", "Soft light emanating from within"),
    ("tattered", "Tattered Fabric", "Worn cloth and frayed edges"),
    ("crystalline", "Crystalline Surfaces", "Facets that catch and split light"),
    ("filigree", "Fine Filigree", "Delicate metalwork tracery"),
];

const SETTING: &[Entry] = &[
    ("urban", "Urban Environment", "City streets and buildings"),
    ("nature", "Natural Setting", "Forests, mountains, or other natural landscapes"),
    ("fantasy", "Fantasy World", "Imaginary and magical environments"),
    ("underwater", "Underwater", "Beneath the ocean surface"),
    ("space", "Outer Space", "Cosmic scenes beyond Earth"),
    ("indoor", "Indoor Scene", "Inside a building or room"),
    ("desert", "Desert", "Endless dunes under an open sky"),
    ("mountain-peak", "Mountain Peak", "High altitude above the clouds"),
    ("ruins", "Ancient Ruins", "Crumbling remains of a lost civilization"),
    ("cyberpunk-city", "Cyberpunk City", "Neon-soaked streets of the future"),
];

const STYLE: &[Entry] = &[
    ("photorealistic", "Photorealistic", "Resembling a high-quality photograph"),
    ("impressionist", "Impressionist", "Capturing light and atmosphere over detail"),
    ("surrealist", "Surrealist", "Dreamlike and unexpected juxtapositions"),
    ("digital-art", "Digital Art", "Modern computer-generated aesthetic"),
    ("watercolor", "Watercolor", "Soft, transparent color washes"),
    ("pop-art", "Pop Art", "Bold colors and popular culture imagery"),
    ("oil-painting", "Oil Painting", "Rich layered brushwork"),
    ("ukiyo-e", "Ukiyo-e", "Japanese woodblock print aesthetic"),
    ("art-nouveau", "Art Nouveau", "Flowing organic lines and ornament"),
    ("pixel-art", "Pixel Art", "Retro low-resolution sprites"),
];

const MOOD: &[Entry] = &[
    ("serene", "Serene", "Peaceful and calm atmosphere"),
    ("dramatic", "Dramatic", "Intense and emotionally charged"),
    ("mysterious", "Mysterious", "Enigmatic and intriguing"),
    ("joyful", "Joyful", "Happy and uplifting"),
    ("melancholic", "Melancholic", "Thoughtful and slightly sad"),
    ("ethereal", "Ethereal", "Delicate and otherworldly"),
    ("whimsical", "Whimsical", "Playful and lighthearted"),
    ("ominous", "Ominous", "Foreboding and threatening"),
    ("nostalgic", "Nostalgic", "Wistful longing for the past"),
    ("triumphant", "Triumphant", "Victorious and grand"),
];

const ELEMENTS: &[Entry] = &[
    ("water", "Water Elements", "Rivers, lakes, or ocean"),
    ("foliage", "Lush Foliage", "Plants, trees, and greenery"),
    ("sky", "Dramatic Sky", "Clouds, stars, or atmospheric effects"),
    ("people", "People", "Human figures or crowds"),
    ("animals", "Animals", "Wildlife or domestic creatures"),
    ("light-rays", "Light Rays", "Beams of light creating atmosphere"),
    ("fog", "Drifting Fog", "Low mist softening the scene"),
    ("fire", "Fire and Embers", "Flames and floating sparks"),
    ("snow", "Falling Snow", "Flakes drifting through the air"),
    ("reflections", "Reflections", "Mirrored surfaces doubling the scene"),
];

const COMPOSITION: &[Entry] = &[
    ("symmetrical", "Symmetrical", "Balanced elements on both sides"),
    ("rule-of-thirds", "Rule of Thirds", "Key elements at intersection points"),
    ("diagonal", "Diagonal Lines", "Dynamic angles across the image"),
    ("framing", "Natural Framing", "Subject framed by surrounding elements"),
    ("leading-lines", "Leading Lines", "Lines that guide the eye to the subject"),
    ("minimalist", "Minimalist", "Simple composition with few elements"),
    ("golden-ratio", "Golden Ratio", "Spiral proportions guiding the eye"),
    ("low-angle", "Low Angle", "Looking up at the subject"),
    ("birds-eye", "Bird's-Eye View", "Looking straight down from above"),
    ("centered", "Centered", "Subject placed in the middle of the frame"),
];

/// Options placed ahead of the stock pool when the chosen subject calls for them.
fn context_prefix(subject: &str, step: &str) -> &'static [Entry] {
    let prefix: &'static [Entry] = match (subject, step) {
        ("portrait", "details") => &[
            ("expressive", "Expressive Face", "Strong emotional expression"),
            ("profile", "Profile View", "Side view of the face"),
            ("close-up", "Close-up", "Detailed view of facial features"),
        ],
        ("landscape", "details") => &[
            ("mountains", "Mountains", "Towering peaks and valleys"),
            ("coastline", "Coastline", "Where land meets sea"),
            ("rolling-hills", "Rolling Hills", "Gentle undulating terrain"),
        ],
        ("portrait", "setting") => &[
            ("studio", "Studio Setting", "Professional photography backdrop"),
            ("street", "Street Scene", "Urban environment with character"),
            ("home", "Home Environment", "Comfortable domestic setting"),
        ],
        ("portrait", "style") => &[
            ("portrait-photography", "Portrait Photography", "Professional portrait style"),
            ("painterly", "Painterly Portrait", "Brushstroke-like texture"),
            ("fashion", "Fashion Photography", "Stylish and trendy aesthetic"),
        ],
        ("landscape", "style") => &[
            ("landscape-photography", "Landscape Photography", "Professional landscape style"),
            ("plein-air", "Plein Air Painting", "Outdoor painting style"),
            ("panoramic", "Panoramic", "Wide, sweeping view"),
        ],
        _ => &[],
    };
    prefix
}

fn step_pool(step: &str) -> Option<&'static [Entry]> {
    let pool: &'static [Entry] = match step {
        "subject" => SUBJECT,
        "details" => DETAILS,
        "setting" => SETTING,
        "style" => STYLE,
        "mood" => MOOD,
        "elements" => ELEMENTS,
        "composition" => COMPOSITION,
        _ => return None,
    };
    Some(pool)
}

fn tag_pool(category: &str) -> Option<&'static [(&'static str, &'static str)]> {
    let pool: &'static [(&'static str, &'static str)] = match category {
        "subject" => &[
            ("portrait", "Portrait"), ("landscape", "Landscape"), ("animal", "Animal"),
            ("cityscape", "Cityscape"), ("still-life", "Still Life"), ("abstract", "Abstract"),
        ],
        "style" => &[
            ("photorealistic", "Photorealistic"), ("oil-painting", "Oil Painting"), ("watercolor", "Watercolor"),
            ("digital-art", "Digital Art"), ("pixel-art", "Pixel Art"), ("3d-render", "3D Render"),
        ],
        "lighting" => &[
            ("natural", "Natural Light"), ("golden-hour", "Golden Hour"), ("dramatic", "Dramatic"),
            ("soft", "Soft"), ("neon", "Neon"), ("backlit", "Backlit"),
        ],
        "composition" => &[
            ("symmetrical", "Symmetrical"), ("rule-of-thirds", "Rule of Thirds"), ("minimalist", "Minimalist"),
            ("dynamic", "Dynamic"), ("close-up", "Close-up"), ("wide-angle", "Wide Angle"),
        ],
        "mood" => &[
            ("peaceful", "Peaceful"), ("mysterious", "Mysterious"), ("joyful", "Joyful"),
            ("melancholic", "Melancholic"), ("energetic", "Energetic"), ("ethereal", "Ethereal"),
        ],
        "color" => &[
            ("vibrant", "Vibrant"), ("monochromatic", "Monochromatic"), ("pastel", "Pastel"),
            ("dark", "Dark"), ("warm", "Warm"), ("cool", "Cool"),
        ],
        "setting" => &[
            ("urban", "Urban"), ("nature", "Nature"), ("fantasy", "Fantasy"),
            ("futuristic", "Futuristic"), ("indoor", "Indoor"), ("underwater", "Underwater"),
        ],
        "time" => &[
            ("modern", "Modern"), ("vintage", "Vintage"), ("medieval", "Medieval"),
            ("ancient", "Ancient"), ("futuristic", "Futuristic"), ("timeless", "Timeless"),
        ],
        _ => return None,
    };
    Some(pool)
}

pub fn is_known_category(id: &str) -> bool {
    WIZARD_STEPS.iter().chain(TAG_CATEGORIES.iter()).any(|c| c.id == id)
}

/// Every candidate for a wizard step given the current selections, in
/// catalog order: subject-specific options first, then the stock pool.
/// Ids are unique within the result.
pub fn step_candidates(step: &str, selections: &Selections) -> Option<Vec<StepOption>> {
    let pool = step_pool(step)?;
    let prefix = selections
        .get("subject")
        .map(|s| context_prefix(&s.id, step))
        .unwrap_or(&[]);

    let mut out: Vec<StepOption> = Vec::with_capacity(prefix.len() + pool.len());
    for (id, label, description) in prefix.iter().chain(pool.iter()) {
        if out.iter().any(|o| o.id == *id) {
            continue;
        }
        out.push(StepOption::new(*id, *label, *description));
    }
    Some(out)
}

/// Options for a tag-mode category. Tag options carry no description.
pub fn tag_options(category: &str) -> Option<Vec<StepOption>> {
    tag_pool(category).map(|pool| {
        pool.iter()
            .map(|(id, label)| StepOption::new(*id, *label, ""))
            .collect()
    })
}

/// Candidates for any known category: wizard pools win over tag pools.
pub fn candidates(category: &str, selections: &Selections) -> Option<Vec<StepOption>> {
    step_candidates(category, selections).or_else(|| tag_options(category))
}

/// Pick `count` options from `pool` for a reroll.
///
/// Options whose label appears in `exclude` (case-insensitive) are only used
/// once every fresh option is taken. Both groups are drawn without replacement
/// after a uniform shuffle.
pub fn draw_fresh<R: Rng + ?Sized>(
    pool: &[StepOption],
    exclude: &[String],
    count: usize,
    rng: &mut R,
) -> Vec<StepOption> {
    let seen = |o: &StepOption| exclude.iter().any(|e| e.eq_ignore_ascii_case(&o.label));
    let (mut fresh, mut stale): (Vec<StepOption>, Vec<StepOption>) =
        pool.iter().cloned().partition(|o| !seen(o));

    fresh.shuffle(rng);
    stale.shuffle(rng);
    fresh.into_iter().chain(stale).take(count).collect()
}

/// Catalog options for one request: the first `count` candidates, or a fresh
/// draw when rerolling.
pub fn lookup<R: Rng + ?Sized>(
    category: &str,
    selections: &Selections,
    reroll: bool,
    exclude: &[String],
    count: usize,
    rng: &mut R,
) -> Option<Vec<StepOption>> {
    let pool = candidates(category, selections)?;
    if reroll {
        Some(draw_fresh(&pool, exclude, count, rng))
    } else {
        Some(pool.into_iter().take(count).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn portrait() -> Selections {
        let mut s = Selections::new();
        s.insert("subject".into(), StepOption::new("portrait", "Human Portrait", ""));
        s
    }

    #[test]
    fn stock_options_are_first_six_of_pool() {
        let mut rng = StdRng::seed_from_u64(1);
        let opts = lookup("mood", &Selections::new(), false, &[], 6, &mut rng).unwrap();
        let labels: Vec<_> = opts.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, ["Serene", "Dramatic", "Mysterious", "Joyful", "Melancholic", "Ethereal"]);
    }

    #[test]
    fn portrait_subject_prefixes_details() {
        let opts = step_candidates("details", &portrait()).unwrap();
        let first: Vec<_> = opts.iter().take(6).map(|o| o.id.as_str()).collect();
        assert_eq!(first, ["expressive", "profile", "close-up", "intricate", "minimalist", "textured"]);
    }

    #[test]
    fn candidate_ids_are_unique() {
        for step in WIZARD_STEPS.iter() {
            let opts = step_candidates(step.id, &portrait()).unwrap();
            let mut ids: Vec<_> = opts.iter().map(|o| o.id.clone()).collect();
            ids.sort();
            ids.dedup();
            assert_eq!(ids.len(), opts.len(), "duplicate id in {}", step.id);
        }
    }

    #[test]
    fn reroll_prefers_unseen_options() {
        let mut rng = StdRng::seed_from_u64(7);
        let shown: Vec<String> = lookup("style", &Selections::new(), false, &[], 6, &mut rng)
            .unwrap()
            .into_iter()
            .map(|o| o.label)
            .collect();
        let rerolled = lookup("style", &Selections::new(), true, &shown, 6, &mut rng).unwrap();
        assert_eq!(rerolled.len(), 6);
        let fresh = rerolled.iter().filter(|o| !shown.contains(&o.label)).count();
        // pool has 10, 6 were shown, so exactly 4 unseen options exist
        assert_eq!(fresh, 4);
        assert!(rerolled.iter().take(4).all(|o| !shown.contains(&o.label)));
    }

    #[test]
    fn reroll_of_tag_category_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut drawn = lookup("lighting", &Selections::new(), true, &[], 6, &mut rng).unwrap();
        let mut stock = tag_options("lighting").unwrap();
        drawn.sort_by(|a, b| a.id.cmp(&b.id));
        stock.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(drawn, stock);
    }

    #[test]
    fn unknown_category_has_no_options() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(lookup("weather", &Selections::new(), false, &[], 6, &mut rng).is_none());
        assert!(!is_known_category("weather"));
        assert!(is_known_category("time"));
    }
}
