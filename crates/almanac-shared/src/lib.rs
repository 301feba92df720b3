use serde::{
  Deserialize,
  Serialize
};

pub const START_DATE_KEY: &str =
  "START_DATE";
pub const END_DATE_KEY: &str =
  "END_DATE";

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct PropertyDto {
  pub key: String,
  #[serde(default)]
  pub val: String
}

impl PropertyDto {
  pub fn new(
    key: impl Into<String>,
    val: impl Into<String>
  ) -> Self {
    Self {
      key: key.into(),
      val: val.into()
    }
  }
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct UserDto {
  pub username: String,
  #[serde(default)]
  pub email:    String
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct ComponentDto {
  #[serde(default)]
  pub c_type:     String,
  #[serde(default)]
  pub properties: Vec<PropertyDto>
}

/// A calendar as returned by `get_calendar_of_current_user`.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct CalendarDto {
  pub name:       String,
  #[serde(default)]
  pub components: Vec<ComponentDto>,
  #[serde(default)]
  pub properties: Vec<PropertyDto>,
  #[serde(default)]
  pub users:      Vec<UserDto>
}
