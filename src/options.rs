use crate::config::PatientProfile;
use serde::Serialize;

/// One selectable identifier. `category` holds the trigger/symptom/relief
/// category, the medication type or the location side.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceOption {
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceData {
    pub triggers: Vec<ReferenceOption>,
    pub symptoms: Vec<ReferenceOption>,
    pub medications: Vec<ReferenceOption>,
    pub locations: Vec<ReferenceOption>,
    pub relief: Vec<ReferenceOption>,
}

impl ReferenceData {
    pub fn builtin() -> Self {
        Self {
            triggers: options(TRIGGERS),
            symptoms: options(SYMPTOMS),
            medications: MEDICATIONS
                .iter()
                .map(|(id, name, kind, dosage)| ReferenceOption {
                    id: id.to_string(),
                    name: name.to_string(),
                    category: kind.to_string(),
                    dosage: dosage.map(str::to_string),
                })
                .collect(),
            locations: options(LOCATIONS),
            relief: options(RELIEF),
        }
    }

    /// Built-in lists extended with the patient's own vocabulary.
    pub fn for_patient(patient: Option<&PatientProfile>) -> Self {
        let mut data = Self::builtin();
        if let Some(patient) = patient {
            extend(&mut data.medications, &patient.prescribed_medications, "prescribed");
            extend(&mut data.relief, &patient.abortives, "abortive");
            extend(&mut data.symptoms, &patient.symptoms, "patient");
        }
        data
    }
}

/// Option name for `id`, or the id with dashes read as spaces.
pub fn display_name(options: &[ReferenceOption], id: &str) -> String {
    options
        .iter()
        .find(|option| option.id == id)
        .map(|option| option.name.clone())
        .unwrap_or_else(|| id.replace('-', " "))
}

pub fn display_names(options: &[ReferenceOption], ids: &[String]) -> Vec<String> {
    ids.iter().map(|id| display_name(options, id)).collect()
}

pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for ch in name.trim().chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

fn extend(list: &mut Vec<ReferenceOption>, names: &[String], category: &str) {
    for name in names {
        let name = name.trim();
        let id = slugify(name);
        if id.is_empty()
            || list
                .iter()
                .any(|option| option.id == id || option.name.eq_ignore_ascii_case(name))
        {
            continue;
        }
        list.push(ReferenceOption {
            id,
            name: name.to_string(),
            category: category.to_string(),
            dosage: None,
        });
    }
}

fn options(table: &[(&str, &str, &str)]) -> Vec<ReferenceOption> {
    table
        .iter()
        .map(|(id, name, category)| ReferenceOption {
            id: id.to_string(),
            name: name.to_string(),
            category: category.to_string(),
            dosage: None,
        })
        .collect()
}

const TRIGGERS: &[(&str, &str, &str)] = &[
    ("aged-cheese", "Aged cheese", "food"),
    ("chocolate", "Chocolate", "food"),
    ("alcohol", "Alcohol (any)", "food"),
    ("red-wine", "Red wine", "food"),
    ("caffeine", "Caffeine", "food"),
    ("caffeine-withdrawal", "Caffeine withdrawal", "food"),
    ("msg", "MSG (monosodium glutamate)", "food"),
    ("aspartame", "Aspartame", "food"),
    ("nitrates", "Nitrates/Nitrites", "food"),
    ("tyramine", "Tyramine-rich foods", "food"),
    ("skipped-meal", "Skipped meal", "food"),
    ("dehydration", "Dehydration", "food"),
    ("bright-lights", "Bright lights", "environmental"),
    ("flashing-lights", "Flashing lights", "environmental"),
    ("loud-sounds", "Loud sounds", "environmental"),
    ("strong-smells", "Strong smells", "environmental"),
    ("weather-change", "Weather changes", "environmental"),
    ("barometric-pressure", "Barometric pressure changes", "environmental"),
    ("high-altitude", "High altitude", "environmental"),
    ("air-quality", "Poor air quality", "environmental"),
    ("allergens", "Allergens", "environmental"),
    ("menstruation", "Menstruation", "hormonal"),
    ("ovulation", "Ovulation", "hormonal"),
    ("birth-control", "Birth control", "hormonal"),
    ("hrt", "Hormone replacement therapy", "hormonal"),
    ("pregnancy", "Pregnancy", "hormonal"),
    ("menopause", "Menopause", "hormonal"),
    ("lack-of-sleep", "Lack of sleep", "lifestyle"),
    ("too-much-sleep", "Too much sleep", "lifestyle"),
    ("sleep-schedule-change", "Sleep schedule change", "lifestyle"),
    ("jet-lag", "Jet lag", "lifestyle"),
    ("irregular-schedule", "Irregular schedule", "lifestyle"),
    ("stress", "Stress", "emotional"),
    ("anxiety", "Anxiety", "emotional"),
    ("depression", "Depression", "emotional"),
    ("excitement", "Excitement", "emotional"),
    ("letdown", "Post-stress letdown", "emotional"),
    ("neck-tension", "Neck tension", "physical"),
    ("eye-strain", "Eye strain", "physical"),
    ("exercise", "Intense exercise", "physical"),
    ("head-injury", "Head injury", "physical"),
    ("dental-problems", "Dental problems", "physical"),
    ("medication-overuse", "Medication overuse", "medication"),
    ("vasodilators", "Vasodilators", "medication"),
    ("nitroglycerin", "Nitroglycerin", "medication"),
];

const SYMPTOMS: &[(&str, &str, &str)] = &[
    ("throbbing", "Throbbing/pulsing pain", "pain"),
    ("stabbing", "Stabbing/sharp pain", "pain"),
    ("burning", "Burning pain", "pain"),
    ("pressure", "Pressure/squeezing", "pain"),
    ("aching", "Dull aching", "pain"),
    ("aura-visual", "Visual aura (flashes, zigzags)", "neurological"),
    ("aura-sensory", "Sensory aura (tingling, numbness)", "neurological"),
    ("aura-speech", "Speech difficulties", "neurological"),
    ("confusion", "Confusion/brain fog", "neurological"),
    ("dizziness", "Dizziness/vertigo", "neurological"),
    ("coordination", "Poor coordination", "neurological"),
    ("nausea", "Nausea", "gastrointestinal"),
    ("vomiting", "Vomiting", "gastrointestinal"),
    ("loss-appetite", "Loss of appetite", "gastrointestinal"),
    ("food-cravings", "Food cravings", "gastrointestinal"),
    ("tearing", "Excessive tearing", "autonomic"),
    ("runny-nose", "Runny/stuffy nose", "autonomic"),
    ("facial-sweating", "Facial sweating", "autonomic"),
    ("red-eye", "Red/bloodshot eye", "autonomic"),
    ("droopy-eyelid", "Droopy eyelid", "autonomic"),
    ("pupil-constriction", "Pupil constriction", "autonomic"),
    ("restlessness", "Restlessness/agitation", "autonomic"),
    ("light-sensitivity", "Light sensitivity", "visual"),
    ("blurred-vision", "Blurred vision", "visual"),
    ("vision-loss", "Temporary vision loss", "visual"),
    ("double-vision", "Double vision", "visual"),
    ("sound-sensitivity", "Sound sensitivity", "sensory"),
    ("smell-sensitivity", "Smell sensitivity", "sensory"),
    ("touch-sensitivity", "Touch sensitivity", "sensory"),
    ("scalp-tenderness", "Scalp tenderness", "sensory"),
];

const LOCATIONS: &[(&str, &str, &str)] = &[
    ("left-temple", "Left temple", "left"),
    ("right-temple", "Right temple", "right"),
    ("left-forehead", "Left forehead", "left"),
    ("right-forehead", "Right forehead", "right"),
    ("left-eye", "Left eye/around eye", "left"),
    ("right-eye", "Right eye/around eye", "right"),
    ("left-side", "Left side of head", "left"),
    ("right-side", "Right side of head", "right"),
    ("back-head", "Back of head", "bilateral"),
    ("top-head", "Top of head", "bilateral"),
    ("whole-head", "Whole head", "bilateral"),
    ("neck", "Neck", "bilateral"),
    ("jaw", "Jaw", "varies"),
    ("sinus", "Sinus area", "varies"),
];

const MEDICATIONS: &[(&str, &str, &str, Option<&str>)] = &[
    ("ibuprofen", "Ibuprofen", "acute", Some("200-800mg")),
    ("acetaminophen", "Acetaminophen/Paracetamol", "acute", Some("500-1000mg")),
    ("aspirin", "Aspirin", "acute", Some("325-650mg")),
    ("naproxen", "Naproxen", "acute", Some("220-440mg")),
    ("sumatriptan", "Sumatriptan", "acute", Some("25-100mg")),
    ("rizatriptan", "Rizatriptan", "acute", Some("5-10mg")),
    ("zolmitriptan", "Zolmitriptan", "acute", Some("2.5-5mg")),
    ("almotriptan", "Almotriptan", "acute", Some("6.25-12.5mg")),
    ("eletriptan", "Eletriptan", "acute", Some("20-40mg")),
    ("frovatriptan", "Frovatriptan", "acute", Some("2.5mg")),
    ("naratriptan", "Naratriptan", "acute", Some("1-2.5mg")),
    ("excedrin", "Excedrin Migraine", "acute", None),
    ("caffeine", "Caffeine", "acute", Some("100-200mg")),
    ("oxygen", "High-flow oxygen", "rescue", Some("15L/min")),
    ("sumatriptan-injection", "Sumatriptan injection", "rescue", Some("6mg")),
    ("zolmitriptan-nasal", "Zolmitriptan nasal spray", "rescue", Some("5mg")),
    ("propranolol", "Propranolol", "preventive", Some("40-240mg daily")),
    ("topiramate", "Topiramate", "preventive", Some("25-200mg daily")),
    ("amitriptyline", "Amitriptyline", "preventive", Some("10-150mg daily")),
    ("verapamil", "Verapamil", "preventive", Some("120-480mg daily")),
    ("lithium", "Lithium", "preventive", None),
    ("melatonin", "Melatonin", "preventive", Some("3-12mg")),
    ("magnesium", "Magnesium", "preventive", Some("400-600mg daily")),
    ("coq10", "CoQ10", "preventive", Some("100-300mg daily")),
    ("riboflavin", "Riboflavin (B2)", "preventive", Some("400mg daily")),
];

const RELIEF: &[(&str, &str, &str)] = &[
    ("medication-effective", "Medication was effective", "medication"),
    ("medication-partial", "Medication partially effective", "medication"),
    ("medication-ineffective", "Medication ineffective", "medication"),
    ("dark-room", "Dark, quiet room", "environmental"),
    ("cold-compress", "Cold compress/ice", "environmental"),
    ("heat-therapy", "Heat therapy", "environmental"),
    ("fresh-air", "Fresh air", "environmental"),
    ("sleep", "Sleep/rest", "therapy"),
    ("massage", "Massage", "therapy"),
    ("pressure-points", "Pressure point therapy", "therapy"),
    ("stretching", "Neck/shoulder stretches", "therapy"),
    ("relaxation", "Relaxation techniques", "therapy"),
    ("meditation", "Meditation", "therapy"),
    ("hydration", "Hydration", "physical"),
    ("movement", "Light movement/walking", "physical"),
    ("pacing", "Pacing/restlessness", "physical"),
    ("vomiting", "Vomiting provided relief", "physical"),
];
