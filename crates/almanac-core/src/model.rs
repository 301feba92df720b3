use std::collections::{
  BTreeMap,
  HashSet
};

use almanac_shared::{
  CalendarDto,
  ComponentDto,
  PropertyDto,
  UserDto
};
use thiserror::Error;
use tracing::{
  debug,
  warn
};

#[derive(
  Debug, Error, Clone, PartialEq, Eq,
)]
pub enum ModelError {
  #[error(
    "calendar name must not be empty"
  )]
  EmptyName,

  #[error(
    "calendar {calendar:?} has a \
     property with an empty key"
  )]
  EmptyPropertyKey { calendar: String },

  #[error(
    "calendar name {0:?} appears more \
     than once in the payload"
  )]
  DuplicateName(String)
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash
)]
pub enum ComponentType {
  Event,
  Todo,
  Venue,
  Other
}

impl ComponentType {
  pub fn parse(raw: &str) -> Self {
    match raw
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "event" => Self::Event,
      | "todo" => Self::Todo,
      | "venue" => Self::Venue,
      | _ => Self::Other
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      | Self::Event => "event",
      | Self::Todo => "todo",
      | Self::Venue => "venue",
      | Self::Other => "other"
    }
  }

  /// Highlight color used for cells covered by this kind of component.
  pub fn accent_color(
    self
  ) -> Option<&'static str> {
    match self {
      | Self::Event => Some("#111111"),
      | Self::Todo
      | Self::Venue
      | Self::Other => None
    }
  }
}

/// Property key/value pairs. Keys are unique; a repeated key keeps the last value.
#[derive(
  Debug,
  Clone,
  Default,
  PartialEq,
  Eq
)]
pub struct PropertyMap {
  entries: BTreeMap<String, String>
}

impl PropertyMap {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(
    &mut self,
    key: impl Into<String>,
    val: impl Into<String>
  ) -> Option<String> {
    self
      .entries
      .insert(key.into(), val.into())
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<&str> {
    self
      .entries
      .get(key)
      .map(String::as_str)
  }

  pub fn contains_key(
    &self,
    key: &str
  ) -> bool {
    self.entries.contains_key(key)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn iter(
    &self
  ) -> impl Iterator<Item = (&str, &str)>
  {
    self
      .entries
      .iter()
      .map(|(k, v)| {
        (k.as_str(), v.as_str())
      })
  }

  fn from_dtos(
    calendar: &str,
    properties: Vec<PropertyDto>
  ) -> Result<Self, ModelError> {
    let mut map = Self::new();
    for property in properties {
      if property.key.trim().is_empty() {
        return Err(
          ModelError::EmptyPropertyKey {
            calendar: calendar
              .to_string()
          }
        );
      }
      if let Some(previous) = map.insert(
        property.key.clone(),
        property.val
      ) {
        debug!(
          calendar,
          key = %property.key,
          previous = %previous,
          "duplicate property key; keeping last value"
        );
      }
    }
    Ok(map)
  }
}

impl<K, V> FromIterator<(K, V)>
  for PropertyMap
where
  K: Into<String>,
  V: Into<String>
{
  fn from_iter<
    I: IntoIterator<Item = (K, V)>
  >(
    iter: I
  ) -> Self {
    let mut map = Self::new();
    for (k, v) in iter {
      map.insert(k, v);
    }
    map
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
  pub kind:       ComponentType,
  pub properties: PropertyMap
}

impl Component {
  pub fn new(
    kind: ComponentType,
    properties: PropertyMap
  ) -> Self {
    Self { kind, properties }
  }

  pub fn summary(&self) -> Option<&str> {
    self
      .properties
      .get("SUMMARY")
      .or_else(|| {
        self.properties.get("NAME")
      })
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
  pub username: String,
  pub email:    String
}

impl From<UserDto> for User {
  fn from(dto: UserDto) -> Self {
    Self {
      username: dto.username,
      email:    dto.email
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Calendar {
  pub name:       String,
  pub components: Vec<Component>,
  pub properties: PropertyMap,
  pub users:      Vec<User>
}

impl Calendar {
  #[tracing::instrument(
    skip(dto),
    fields(name = %dto.name)
  )]
  pub fn from_dto(
    dto: CalendarDto
  ) -> Result<Self, ModelError> {
    let name =
      dto.name.trim().to_string();
    if name.is_empty() {
      return Err(ModelError::EmptyName);
    }

    let components = dto
      .components
      .into_iter()
      .map(|component| {
        map_component(&name, component)
      })
      .collect::<Result<Vec<_>, _>>()?;
    let properties =
      PropertyMap::from_dtos(
        &name,
        dto.properties
      )?;
    let users = dto
      .users
      .into_iter()
      .map(User::from)
      .collect();

    debug!(
      components = components.len(),
      properties = properties.len(),
      "mapped calendar"
    );

    Ok(Self {
      name,
      components,
      properties,
      users
    })
  }
}

fn map_component(
  calendar: &str,
  dto: ComponentDto
) -> Result<Component, ModelError> {
  let kind =
    ComponentType::parse(&dto.c_type);
  if kind == ComponentType::Other
    && !dto.c_type.trim().is_empty()
  {
    debug!(calendar, c_type = %dto.c_type, "unknown component type; treating as other");
  }
  let properties =
    PropertyMap::from_dtos(
      calendar,
      dto.properties
    )?;
  Ok(Component::new(kind, properties))
}

/// Maps a full backend payload, rejecting calendars that share a name.
#[tracing::instrument(
  skip_all,
  fields(count = dtos.len())
)]
pub fn map_calendars(
  dtos: Vec<CalendarDto>
) -> Result<Vec<Calendar>, ModelError> {
  let mut seen = HashSet::new();
  let mut out =
    Vec::with_capacity(dtos.len());

  for dto in dtos {
    let calendar =
      Calendar::from_dto(dto)?;
    if !seen.insert(calendar.name.clone())
    {
      warn!(name = %calendar.name, "duplicate calendar name in payload");
      return Err(
        ModelError::DuplicateName(
          calendar.name
        )
      );
    }
    out.push(calendar);
  }

  Ok(out)
}
