//! Per-category copy and prompt templates for the try-on pipeline.
//!
//! Every category is plain data: a fixed analysis prompt and a template that
//! embeds the analysis text verbatim into the editing instruction. Adding a
//! category means adding a variant and one profile below.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Category {
    #[default]
    Shoes,
    Tshirts,
    Hoodies,
    Jackets,
    Pants,
    Suits,
    Traditional,
    Sportswear,
    Glasses,
    Hats,
    Watches,
    Bracelets,
    Bags,
}

/// Navigation grouping of categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryGroup {
    Apparel,
    Accessories,
}

impl CategoryGroup {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Apparel => "apparel",
            Self::Accessories => "accessories",
        }
    }

    /// Category selected when the group itself is chosen.
    pub fn default_category(self) -> Category {
        match self {
            Self::Apparel => Category::Shoes,
            Self::Accessories => Category::Glasses,
        }
    }
}

impl Category {
    pub const ALL: [Category; 13] = [
        Category::Shoes,
        Category::Tshirts,
        Category::Hoodies,
        Category::Jackets,
        Category::Pants,
        Category::Suits,
        Category::Traditional,
        Category::Sportswear,
        Category::Glasses,
        Category::Hats,
        Category::Watches,
        Category::Bracelets,
        Category::Bags,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Shoes => "shoes",
            Self::Tshirts => "tshirts",
            Self::Hoodies => "hoodies",
            Self::Jackets => "jackets",
            Self::Pants => "pants",
            Self::Suits => "suits",
            Self::Traditional => "traditional",
            Self::Sportswear => "sportswear",
            Self::Glasses => "glasses",
            Self::Hats => "hats",
            Self::Watches => "watches",
            Self::Bracelets => "bracelets",
            Self::Bags => "bags",
        }
    }

    /// Parses a category key. Also accepts a few spellings users type naturally
    /// and the group names, which resolve to the group's default category.
    pub fn from_key(value: &str) -> Option<Self> {
        let normalized = value.trim().to_lowercase().replace(['_', ' '], "-");
        let category = match normalized.as_str() {
            "shoes" | "shoe" | "footwear" => Self::Shoes,
            "tshirts" | "tshirt" | "t-shirts" | "t-shirt" => Self::Tshirts,
            "hoodies" | "hoodie" | "sweatshirts" | "sweatshirt" => Self::Hoodies,
            "jackets" | "jacket" | "coats" | "coat" => Self::Jackets,
            "pants" | "trousers" => Self::Pants,
            "suits" | "suit" => Self::Suits,
            "traditional" | "traditional-wear" => Self::Traditional,
            "sportswear" | "athletic" => Self::Sportswear,
            "glasses" | "sunglasses" | "eyewear" => Self::Glasses,
            "hats" | "hat" | "caps" | "cap" => Self::Hats,
            "watches" | "watch" => Self::Watches,
            "bracelets" | "bracelet" => Self::Bracelets,
            "bags" | "bag" => Self::Bags,
            "apparel" => CategoryGroup::Apparel.default_category(),
            "accessories" => CategoryGroup::Accessories.default_category(),
            _ => return None,
        };
        Some(category)
    }

    pub fn group(self) -> CategoryGroup {
        match self {
            Self::Glasses | Self::Hats | Self::Watches | Self::Bracelets | Self::Bags => {
                CategoryGroup::Accessories
            }
            _ => CategoryGroup::Apparel,
        }
    }

    pub fn profile(self) -> &'static CategoryProfile {
        lookup(self)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct CategoryProfile {
    pub key: Category,
    pub title: &'static str,
    pub description: &'static str,
    pub item_label: &'static str,
    pub analysis_prompt: &'static str,
    generation_template: fn(&str) -> String,
}

impl fmt::Debug for CategoryProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CategoryProfile")
            .field("key", &self.key)
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}

impl CategoryProfile {
    /// Builds the editing instruction around the analysis text.
    pub fn generation_prompt(&self, analysis_text: &str) -> String {
        (self.generation_template)(analysis_text)
    }
}

pub fn lookup(category: Category) -> &'static CategoryProfile {
    match category {
        Category::Shoes => &SHOES,
        Category::Tshirts => &TSHIRTS,
        Category::Hoodies => &HOODIES,
        Category::Jackets => &JACKETS,
        Category::Pants => &PANTS,
        Category::Suits => &SUITS,
        Category::Traditional => &TRADITIONAL,
        Category::Sportswear => &SPORTSWEAR,
        Category::Glasses => &GLASSES,
        Category::Hats => &HATS,
        Category::Watches => &WATCHES,
        Category::Bracelets => &BRACELETS,
        Category::Bags => &BAGS,
    }
}

static SHOES: CategoryProfile = CategoryProfile {
    key: Category::Shoes,
    title: "Virtual Shoe Try-On",
    description: "Upload a photo of a model and a photo of shoes to see them combined!",
    item_label: "Shoe Image",
    analysis_prompt: "Analyze the provided image of a person. Describe their pose, clothing style, the overall atmosphere of the photo, and the environment. Pay close attention to their feet and legs: are they visible, what is their position and angle, and what kind of footwear, if any, are they wearing? This information will be used to realistically place a new pair of shoes on them.",
    generation_template: shoes_instruction,
};

fn shoes_instruction(analysis: &str) -> String {
    format!(
        "You are an expert photo editor. Your task is to seamlessly photoshop the shoes from the second image onto the person in the first image. Use this analysis of the person's pose and style to guide you: \"{analysis}\". The final image should be photorealistic. The lighting, shadows, and perspective of the new shoes must perfectly match the original photograph. Do not change the person or the background. Only replace the footwear."
    )
}

static TSHIRTS: CategoryProfile = CategoryProfile {
    key: Category::Tshirts,
    title: "Virtual T-Shirt Try-On",
    description: "Upload a photo of a model and a photo of a t-shirt to see them combined!",
    item_label: "T-Shirt Image",
    analysis_prompt: "Analyze the provided image of a person. Describe their pose, body shape, clothing style, the overall atmosphere of the photo, and the environment. Pay close attention to their torso and arms: are they visible, what is their position and angle, and what kind of top, if any, are they wearing? This information will be used to realistically place a new t-shirt on them.",
    generation_template: tshirt_instruction,
};

fn tshirt_instruction(analysis: &str) -> String {
    format!(
        "You are an expert photo editor. Your task is to seamlessly photoshop the t-shirt from the second image onto the person in the first image. Use this analysis of the person's pose and style to guide you: \"{analysis}\". The final image should be photorealistic. The lighting, shadows, and perspective of the new t-shirt must perfectly match the original photograph. Ensure the t-shirt fits naturally on the person's body. Do not change the person or the background. Only replace their upper body clothing."
    )
}

static HOODIES: CategoryProfile = CategoryProfile {
    key: Category::Hoodies,
    title: "Virtual Hoodie/Sweatshirt Try-On",
    description: "Upload a photo of a model and a photo of a hoodie or sweatshirt to see them combined!",
    item_label: "Hoodie/Sweatshirt Image",
    analysis_prompt: "Analyze the provided image of a person. Describe their pose, body shape, clothing style, the overall atmosphere of the photo, and the environment. Pay close attention to their torso, shoulders, arms, and head/neck area: are they visible, what is their position and angle, and what kind of top, if any, are they wearing? This information will be used to realistically place a new hoodie or sweatshirt on them, including how a hood might rest on their shoulders or head.",
    generation_template: hoodie_instruction,
};

fn hoodie_instruction(analysis: &str) -> String {
    format!(
        "You are an expert photo editor. Your task is to seamlessly photoshop the hoodie or sweatshirt from the second image onto the person in the first image. Use this analysis of the person's pose and style to guide you: \"{analysis}\". The final image should be photorealistic. The lighting, shadows, and perspective of the new top must perfectly match the original photograph. Ensure the hoodie/sweatshirt fits naturally on the person's body, paying attention to how a hood would drape. Do not change the person or the background. Only replace their upper body clothing."
    )
}

static JACKETS: CategoryProfile = CategoryProfile {
    key: Category::Jackets,
    title: "Virtual Jacket/Coat Try-On",
    description: "Upload a photo of a model and a photo of a jacket or coat to see them combined!",
    item_label: "Jacket/Coat Image",
    analysis_prompt: "Analyze the provided image of a person. Describe their pose, body shape, and current clothing. Pay close attention to their torso, shoulders, and arms, noting their position and angle. This information will be used to realistically place a new jacket or coat over their current attire, ensuring it drapes correctly and fits their build.",
    generation_template: jacket_instruction,
};

fn jacket_instruction(analysis: &str) -> String {
    format!(
        "You are an expert photo editor. Your task is to seamlessly photoshop the jacket or coat from the second image onto the person in the first image, placing it over their existing clothes. Use this analysis of the person's pose and style to guide you: \"{analysis}\". The final image should be photorealistic. The lighting, shadows, and perspective of the new outerwear must perfectly match the original photograph. Ensure the jacket/coat fits naturally on the person's body, paying attention to details like collars and how it hangs. Do not change the person, their inner clothes, or the background. Only add the jacket/coat as the outermost layer."
    )
}

static PANTS: CategoryProfile = CategoryProfile {
    key: Category::Pants,
    title: "Virtual Pants Try-On",
    description: "Upload a photo of a model and a photo of pants to see them combined!",
    item_label: "Pants Image",
    analysis_prompt: "Analyze the provided image of a person. Describe their pose, body shape, clothing style, the overall atmosphere of the photo, and the environment. Pay close attention to their lower body, waist, and legs: are they visible, what is their position and angle, and what kind of trousers/skirt, if any, are they wearing? This information will be used to realistically place a new pair of pants on them.",
    generation_template: pants_instruction,
};

fn pants_instruction(analysis: &str) -> String {
    format!(
        "You are an expert photo editor. Your task is to seamlessly photoshop the pants from the second image onto the person in the first image. Use this analysis of the person's pose and style to guide you: \"{analysis}\". The final image should be photorealistic. The lighting, shadows, and perspective of the new pants must perfectly match the original photograph. Ensure the pants fit naturally on the person's body from the waist down. Do not change the person or the background. Only replace their lower body clothing."
    )
}

static SUITS: CategoryProfile = CategoryProfile {
    key: Category::Suits,
    title: "Virtual Suit Try-On",
    description: "Upload a photo of a model and a photo of a suit to see them combined!",
    item_label: "Suit Image",
    analysis_prompt: "Analyze the provided image of a person. Describe their pose, body build (shoulders, chest, waist), clothing style, the overall atmosphere of the photo, and the environment. Pay close attention to their entire figure, from shoulders to legs. Note the position of their arms and torso, and what kind of clothing they are currently wearing. This information will be used to realistically place a new suit (jacket and trousers) on them.",
    generation_template: suit_instruction,
};

fn suit_instruction(analysis: &str) -> String {
    format!(
        "You are an expert photo editor. Your task is to seamlessly photoshop the suit from the second image onto the person in the first image. Use this analysis of the person's pose and build to guide you: \"{analysis}\". The final image should be photorealistic. The suit jacket should fit naturally over their torso and arms, and the trousers should fit their legs. The lighting, shadows, and perspective of the new suit must perfectly match the original photograph. Do not change the person or the background. Only replace their clothing with the complete suit."
    )
}

static TRADITIONAL: CategoryProfile = CategoryProfile {
    key: Category::Traditional,
    title: "Virtual Traditional Wear Try-On",
    description: "For garments like kurtas, abayas, saris, etc. Upload a model photo and a photo of the item.",
    item_label: "Garment Image",
    analysis_prompt: "Analyze the provided image of a person. Describe their pose, body shape, and full body posture. Pay close attention to their shoulders, torso, waist, and legs, noting their position and angles. Consider the overall context and style. This information is crucial for realistically draping a traditional garment, which might be a flowing abaya, a wrapped sari, or a structured kurta, onto their figure.",
    generation_template: traditional_instruction,
};

fn traditional_instruction(analysis: &str) -> String {
    format!(
        "You are an expert cultural fashion editor. Your task is to seamlessly photoshop the traditional garment from the second image onto the person in the first image. Use this analysis of the person's pose and build to guide you: \"{analysis}\". The final image should be photorealistic and culturally respectful. The lighting, shadows, and perspective of the new garment must perfectly match the original photograph. Ensure the garment drapes and fits naturally according to its specific type (e.g., a sari's pleats, a kurta's fit). Do not change the person or the background. Only replace their clothing with the traditional wear."
    )
}

static SPORTSWEAR: CategoryProfile = CategoryProfile {
    key: Category::Sportswear,
    title: "Virtual Sportswear Try-On",
    description: "Try on gym outfits, jerseys, and other athletic apparel.",
    item_label: "Sportswear Image",
    analysis_prompt: "Analyze the provided image of a person. Describe their pose, body build, and current clothing. Pay close attention to their torso, shoulders, and legs, noting their position and any athletic posture. This information will be used to realistically fit sportswear like a gym outfit or a jersey onto them.",
    generation_template: sportswear_instruction,
};

fn sportswear_instruction(analysis: &str) -> String {
    format!(
        "You are an expert photo editor specializing in athletic apparel. Your task is to seamlessly photoshop the sportswear from the second image onto the person in the first image. Use this analysis of the person's pose and build to guide you: \"{analysis}\". The final image should be photorealistic. Ensure the sportswear fits naturally for an active context, showing how the fabric would stretch or hang. The lighting, shadows, and perspective of the new apparel must perfectly match the original photograph. Do not change the person or the background. Only replace their clothing with the sportswear."
    )
}

static GLASSES: CategoryProfile = CategoryProfile {
    key: Category::Glasses,
    title: "Virtual Glasses/Sunglasses Try-On",
    description: "Upload a photo of a model and a photo of eyewear to see them combined!",
    item_label: "Eyewear Image",
    analysis_prompt: "Analyze the provided image of a person. Describe their face shape, the position of their eyes, nose, and ears, and the angle of their head. This information will be used to realistically place glasses or sunglasses on their face.",
    generation_template: glasses_instruction,
};

fn glasses_instruction(analysis: &str) -> String {
    format!(
        "You are an expert photo editor. Your task is to seamlessly photoshop the glasses/sunglasses from the second image onto the person's face in the first image. Use this analysis of the person's face and head position to guide you: \"{analysis}\". The final image should be photorealistic. Ensure the eyewear sits correctly on the nose and ears, and that the perspective matches the head's angle. Do not change any other part of the person or background."
    )
}

static HATS: CategoryProfile = CategoryProfile {
    key: Category::Hats,
    title: "Virtual Hat/Cap Try-On",
    description: "Upload a photo of a model and a photo of a hat or cap to see them combined!",
    item_label: "Hat/Cap Image",
    analysis_prompt: "Analyze the provided image of a person. Describe their head shape, hairstyle, and the angle they are facing. This information will be used to realistically place a hat or cap on their head.",
    generation_template: hat_instruction,
};

fn hat_instruction(analysis: &str) -> String {
    format!(
        "You are an expert photo editor. Your task is to seamlessly photoshop the hat/cap from the second image onto the person's head in the first image. Use this analysis of the person's head and hairstyle to guide you: \"{analysis}\". The final image should be photorealistic. The hat must fit naturally, casting appropriate shadows on the face and hair. Do not change the person or background."
    )
}

static WATCHES: CategoryProfile = CategoryProfile {
    key: Category::Watches,
    title: "Virtual Watch Try-On",
    description: "Upload a photo of a model and a photo of a watch to see it on their wrist!",
    item_label: "Watch Image",
    analysis_prompt: "Analyze the provided image of a person. Pay close attention to their wrists and hands, noting their position, angle, and whether they are visible. This information will be used to realistically place a watch on their wrist.",
    generation_template: watch_instruction,
};

fn watch_instruction(analysis: &str) -> String {
    format!(
        "You are an expert photo editor. Your task is to seamlessly photoshop the watch from the second image onto the person's wrist in the first image. Use this analysis of the person's arm and wrist to guide you: \"{analysis}\". The watch should fit snugly and be oriented correctly based on the arm's position. Match lighting and shadows perfectly. Do not change any other part of the person or background."
    )
}

static BRACELETS: CategoryProfile = CategoryProfile {
    key: Category::Bracelets,
    title: "Virtual Bracelet Try-On",
    description: "Upload a photo of a model and a photo of a bracelet to see it on their wrist!",
    item_label: "Bracelet Image",
    analysis_prompt: "Analyze the provided image of a person. Pay close attention to their wrists and forearms, noting their position, angle, and whether they are visible. This information will be used to realistically place a bracelet on their wrist.",
    generation_template: bracelet_instruction,
};

fn bracelet_instruction(analysis: &str) -> String {
    format!(
        "You are an expert photo editor. Your task is to seamlessly photoshop the bracelet from the second image onto the person's wrist in the first image. Use this analysis of the person's arm and wrist to guide you: \"{analysis}\". The bracelet should drape or fit naturally depending on its style. Match lighting and shadows perfectly. Do not change any other part of the person or background."
    )
}

static BAGS: CategoryProfile = CategoryProfile {
    key: Category::Bags,
    title: "Virtual Bag Try-On",
    description: "Upload a photo of a model and a photo of a bag to see them combined!",
    item_label: "Bag Image",
    analysis_prompt: "Analyze the provided image of a person's full-body pose. Describe how they are standing or sitting, the position of their arms, hands, and shoulders. This information will determine the most natural way to place a bag (e.g., held in hand, on the shoulder, or crossbody).",
    generation_template: bag_instruction,
};

fn bag_instruction(analysis: &str) -> String {
    format!(
        "You are an expert photo editor. Your task is to seamlessly photoshop the bag from the second image onto the person in the first image. Use this analysis of the person's pose to guide you: \"{analysis}\". Place the bag in a natural position: held in the hand, on the shoulder, or across the body. Ensure straps and handles interact realistically with their clothing and body. Match lighting and shadows. Do not change the person or background."
    )
}
