//! Specialty vocabulary shared by discovery, export and outreach.

/// Specialty tag and the lowercase phrases that imply it.
pub const SPECIALTY_KEYWORDS: &[(&str, &[&str])] = &[
    ("Reiki", &["reiki"]),
    (
        "Crystal Healing",
        &["crystal", "crystals", "crystal healing", "gemstone"],
    ),
    (
        "Energy Healing",
        &["energy healing", "energy work", "energy medicine"],
    ),
    (
        "Spiritual Coaching",
        &[
            "spiritual coach",
            "spiritual guide",
            "spiritual guidance",
            "spiritual coaching",
            "life coach",
        ],
    ),
    ("Meditation", &["meditation", "meditation teacher"]),
    ("Mindfulness", &["mindfulness", "mindful"]),
    ("Chakra Healing", &["chakra", "chakras", "chakra balancing"]),
    (
        "Sound Therapy",
        &["sound healing", "singing bowls", "sound bath", "sound therapy"],
    ),
    ("Tarot", &["tarot", "card reading"]),
    ("Astrology", &["astrology", "astrologer", "birth chart"]),
    (
        "Holistic Therapy",
        &["holistic therapy", "holistic healing", "holistic"],
    ),
    ("Alternative Healing", &["alternative", "complementary"]),
    ("Wellness Coaching", &["wellness", "wellbeing"]),
];

/// Words that mark a bio or listing as healing-related.
pub const QUALIFICATION_KEYWORDS: &[&str] = &[
    "reiki",
    "crystal",
    "energy",
    "healing",
    "spiritual",
    "chakra",
    "meditation",
    "mindfulness",
    "holistic",
    "wellness",
    "light",
    "soul",
    "aura",
    "manifestation",
    "coach",
    "guide",
    "teacher",
];

/// Words a directory listing must contain to count as a spiritual practice.
pub const SPIRITUAL_LISTING_KEYWORDS: &[&str] = &[
    "spiritual",
    "energy",
    "reiki",
    "holistic",
    "healing",
    "mindfulness",
    "crystal",
];

/// Specialties outreach converts best with.
pub const HIGH_VALUE_SPECIALTIES: &[&str] = &[
    "Reiki",
    "Energy Healing",
    "Crystal Healing",
    "Spiritual Coaching",
];

/// Specialty tags implied by free text, in table order, without duplicates.
#[must_use]
pub fn specialties_in(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    SPECIALTY_KEYWORDS
        .iter()
        .filter(|(_, phrases)| phrases.iter().any(|p| lower.contains(p)))
        .map(|(tag, _)| (*tag).to_string())
        .collect()
}

/// Whether free text contains any of `keywords` (case-insensitive).
#[must_use]
pub fn mentions_any(text: &str, keywords: &[&str]) -> bool {
    let lower = text.to_lowercase();
    keywords.iter().any(|k| lower.contains(k))
}

/// Whether any specialty is in the high-value set.
#[must_use]
pub fn has_high_value_specialty(specialties: &[String]) -> bool {
    specialties.iter().any(|s| {
        HIGH_VALUE_SPECIALTIES
            .iter()
            .any(|hv| s.eq_ignore_ascii_case(hv))
    })
}
