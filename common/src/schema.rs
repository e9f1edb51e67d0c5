use serde::{ser::SerializeSeq, Serialize, Serializer};

use crate::{
    catalog::TimezoneOption,
    color::PackedColor,
    keys::FieldName,
};

pub const SETTINGS_TITLE: &str = "Timezone Traveler Settings";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Heading,
    Text,
    Select,
    Toggle,
    Color,
    Submit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldDefault {
    Text(String),
    Flag(bool),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(rename = "messageKey", skip_serializing_if = "Option::is_none")]
    pub field_name: Option<FieldName>,
    #[serde(rename = "defaultValue")]
    pub default_value: FieldDefault,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<TimezoneOption>>,
}

impl Field {
    fn bare(kind: FieldKind, default_value: FieldDefault) -> Self {
        Self {
            kind,
            field_name: None,
            default_value,
            label: None,
            description: None,
            options: None,
        }
    }

    pub fn heading(text: &str) -> Self {
        Self::bare(FieldKind::Heading, FieldDefault::Text(text.to_string()))
    }

    pub fn text(text: &str) -> Self {
        Self::bare(FieldKind::Text, FieldDefault::Text(text.to_string()))
    }

    pub fn submit(text: &str) -> Self {
        Self::bare(FieldKind::Submit, FieldDefault::Text(text.to_string()))
    }

    /// Single-select whose first option is always "None".
    pub fn timezone_select(name: FieldName, label: &str, catalog: &[TimezoneOption]) -> Self {
        let mut options = Vec::with_capacity(catalog.len() + 1);
        options.push(TimezoneOption::none());
        options.extend_from_slice(catalog);

        Self {
            field_name: Some(name),
            label: Some(label.to_string()),
            options: Some(options),
            ..Self::bare(FieldKind::Select, FieldDefault::Text(String::new()))
        }
    }

    pub fn toggle(name: FieldName, label: &str, description: &str) -> Self {
        Self {
            field_name: Some(name),
            label: Some(label.to_string()),
            description: Some(description.to_string()),
            ..Self::bare(FieldKind::Toggle, FieldDefault::Flag(false))
        }
    }

    pub fn color(name: FieldName, label: &str, default: PackedColor) -> Self {
        Self {
            field_name: Some(name),
            label: Some(label.to_string()),
            ..Self::bare(FieldKind::Color, FieldDefault::Text(default.to_hex()))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionLayout {
    /// Items render at the top level of the form.
    Inline,
    /// Items render inside a boxed configurator section.
    Grouped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub layout: SectionLayout,
    pub items: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSchema {
    pub sections: Vec<Section>,
}

impl ConfigSchema {
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.sections.iter().flat_map(|section| section.items.iter())
    }

    pub fn field(&self, name: FieldName) -> Option<&Field> {
        self.fields().find(|field| field.field_name == Some(name))
    }

    pub fn selects(&self) -> impl Iterator<Item = &Field> {
        self.fields().filter(|field| field.kind == FieldKind::Select)
    }
}

#[derive(Serialize)]
struct GroupedSection<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    items: &'a [Field],
}

impl Serialize for ConfigSchema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(None)?;
        for section in &self.sections {
            match section.layout {
                SectionLayout::Inline => {
                    for item in &section.items {
                        seq.serialize_element(item)?;
                    }
                }
                SectionLayout::Grouped => seq.serialize_element(&GroupedSection {
                    kind: "section",
                    items: &section.items,
                })?,
            }
        }
        seq.end()
    }
}

/// Builds the settings form around the given catalog.
pub fn build_schema(catalog: &[TimezoneOption]) -> ConfigSchema {
    let intro = Section {
        layout: SectionLayout::Inline,
        items: vec![
            Field::heading(SETTINGS_TITLE),
            Field::text("Configure your 6 timezones and appearance settings."),
        ],
    };

    let timezones = Section {
        layout: SectionLayout::Grouped,
        items: vec![
            Field::heading("Home Timezone"),
            Field::timezone_select(FieldName::Home, "Home Timezone", catalog),
            Field::heading("Additional Timezones"),
            Field::timezone_select(FieldName::Timezone1, "Timezone 3", catalog),
            Field::timezone_select(FieldName::Timezone2, "Timezone 4", catalog),
            Field::timezone_select(FieldName::Timezone3, "Timezone 5", catalog),
            Field::timezone_select(FieldName::Timezone4, "Timezone 6", catalog),
        ],
    };

    let display = Section {
        layout: SectionLayout::Grouped,
        items: vec![
            Field::heading("Display Options"),
            Field::toggle(
                FieldName::AlwaysShowHome,
                "Always Display Home Timezone?",
                "When enabled, the home timezone will always be shown on the watch face regardless of navigation",
            ),
            Field::toggle(
                FieldName::ShowSeconds,
                "Show Seconds (Main Time)",
                "Display seconds for the current timezone",
            ),
            Field::toggle(
                FieldName::ShowHomeSeconds,
                "Show Seconds (Home Time)",
                "Display seconds for the home timezone when visible",
            ),
        ],
    };

    let colors = Section {
        layout: SectionLayout::Grouped,
        items: vec![
            Field::heading("Color Settings"),
            Field::text(
                "Choose colors for different elements. Colors work on Pebble Time and later models.",
            ),
            Field::color(FieldName::BackgroundColor, "Background Color", PackedColor::BLACK),
            Field::color(FieldName::TimeColor, "Main Time Color", PackedColor::WHITE),
            Field::color(
                FieldName::TimezoneLabelColor,
                "Timezone Label Color",
                PackedColor::LIGHT_GRAY,
            ),
            Field::color(FieldName::HomeTimeColor, "Home Time Color", PackedColor::LIGHT_GRAY),
        ],
    };

    let help = Section {
        layout: SectionLayout::Inline,
        items: vec![
            Field::text(
                "Navigation:\n• Y+ (tilt up): Previous timezone\n• Y- (tilt down): Next timezone\n• Tap screen: Next timezone",
            ),
            Field::submit("Save Settings"),
        ],
    };

    ConfigSchema {
        sections: vec![intro, timezones, display, colors, help],
    }
}
