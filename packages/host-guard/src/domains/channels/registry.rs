use std::collections::HashMap;

use super::errors::RegistryError;
use super::payload::{FieldSpec, FieldType, PayloadShape};

/// One allow-listed channel
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelDescriptor {
    pub name: &'static str,
    /// Default human-readable operation label shown in consent prompts
    pub description: &'static str,
    pub requires_consent: bool,
    pub payload_shape: PayloadShape,
}

impl ChannelDescriptor {
    pub fn open(name: &'static str, description: &'static str, payload_shape: PayloadShape) -> Self {
        Self {
            name,
            description,
            requires_consent: false,
            payload_shape,
        }
    }

    pub fn privileged(
        name: &'static str,
        description: &'static str,
        payload_shape: PayloadShape,
    ) -> Self {
        Self {
            name,
            description,
            requires_consent: true,
            payload_shape,
        }
    }
}

/// Closed table of every channel the host will ever execute.
///
/// Fixed at construction; there is no way to add entries afterwards.
#[derive(Debug, Clone)]
pub struct ChannelRegistry {
    channels: HashMap<&'static str, ChannelDescriptor>,
}

impl ChannelRegistry {
    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = ChannelDescriptor>,
    ) -> Result<Self, RegistryError> {
        let mut channels = HashMap::new();
        for descriptor in descriptors {
            if channels.contains_key(descriptor.name) {
                return Err(RegistryError::DuplicateChannel(descriptor.name.to_string()));
            }
            channels.insert(descriptor.name, descriptor);
        }
        Ok(Self { channels })
    }

    /// The host's built-in channel table
    pub fn builtin() -> Self {
        Self::from_descriptors(builtin_descriptors())
            .expect("built-in channel names are unique")
    }

    pub fn get(&self, name: &str) -> Option<&ChannelDescriptor> {
        self.channels.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    /// Channel names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.channels.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

pub fn builtin_descriptors() -> Vec<ChannelDescriptor> {
    let email = || FieldType::string(3, 254);

    vec![
        // Settings
        ChannelDescriptor::open(
            "settings:get",
            "Read assistant settings",
            PayloadShape::Object(vec![FieldSpec::optional(
                "key",
                FieldType::string(1, 128),
            )]),
        ),
        ChannelDescriptor::open(
            "settings:update",
            "Change an assistant setting",
            PayloadShape::Object(vec![
                FieldSpec::required("key", FieldType::string(1, 128)),
                FieldSpec::required("value", FieldType::string(0, 4096)),
            ]),
        ),
        // Plugins
        ChannelDescriptor::open("plugin:list", "List installed plugins", PayloadShape::None),
        ChannelDescriptor::privileged(
            "plugin:start",
            "Start a plugin",
            PayloadShape::Object(vec![
                FieldSpec::required("pluginId", FieldType::string(1, 128)),
                FieldSpec::optional(
                    "args",
                    FieldType::StringList {
                        max_items: 16,
                        max_len: 256,
                    },
                ),
            ]),
        ),
        ChannelDescriptor::open(
            "plugin:stop",
            "Stop a plugin",
            PayloadShape::Object(vec![FieldSpec::required(
                "pluginId",
                FieldType::string(1, 128),
            )]),
        ),
        // Host resources
        ChannelDescriptor::privileged(
            "fs:read-file",
            "Read a file from disk",
            PayloadShape::Object(vec![
                FieldSpec::required("path", FieldType::string(1, 4096)),
                FieldSpec::optional("encoding", FieldType::OneOf(&["utf8", "base64"])),
            ]),
        ),
        ChannelDescriptor::privileged(
            "shell:open-external",
            "Open a link in the system browser",
            PayloadShape::Object(vec![FieldSpec::required(
                "url",
                FieldType::string(1, 2048),
            )]),
        ),
        // Model access
        ChannelDescriptor::open(
            "llm:generate",
            "Generate a model response",
            PayloadShape::Object(vec![
                FieldSpec::required("prompt", FieldType::string(1, 32_768)),
                FieldSpec::optional("model", FieldType::string(1, 128)),
                FieldSpec::optional("maxTokens", FieldType::integer(1, 32_768)),
                FieldSpec::optional("temperature", FieldType::integer(0, 200)),
                FieldSpec::optional("stream", FieldType::Boolean),
                FieldSpec::optional(
                    "stop",
                    FieldType::StringList {
                        max_items: 4,
                        max_len: 64,
                    },
                ),
            ]),
        ),
        // Authentication
        ChannelDescriptor::open(
            "auth:request-otp",
            "Request a sign-in code",
            PayloadShape::Object(vec![FieldSpec::required("email", email())]),
        ),
        ChannelDescriptor::open(
            "auth:verify-otp",
            "Sign in with a code",
            PayloadShape::Object(vec![
                FieldSpec::required("email", email()),
                FieldSpec::required("code", FieldType::string(4, 9)),
            ]),
        ),
        ChannelDescriptor::open("auth:logout", "Sign out", PayloadShape::None),
    ]
}
