// Copyright 2018-2024 the Deno authors. MIT license.

use thiserror::Error;

use crate::dependency::ContextDependency;
use crate::dependency::Dependency;
use crate::dependency::StaticUrlDependency;
use crate::dependency::UrlContextDependency;

#[derive(Debug, Error, deno_error::JsError)]
pub enum SerializationError {
  #[class(generic)]
  #[error(transparent)]
  Bincode(#[from] bincode::Error),
  #[class(type)]
  #[error("Unknown dependency tag {0}.")]
  UnknownTag(u8),
}

/// Writes values one after another. Reading them back requires reading
/// the same types in the same order.
#[derive(Debug, Default)]
pub struct ObjectWriter {
  buffer: Vec<u8>,
}

impl ObjectWriter {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn write<T: serde::Serialize + ?Sized>(
    &mut self,
    value: &T,
  ) -> Result<(), SerializationError> {
    bincode::serialize_into(&mut self.buffer, value)?;
    Ok(())
  }

  pub fn into_bytes(self) -> Vec<u8> {
    self.buffer
  }
}

pub struct ObjectReader<'a> {
  remaining: &'a [u8],
}

impl<'a> ObjectReader<'a> {
  pub fn new(bytes: &'a [u8]) -> Self {
    Self { remaining: bytes }
  }

  pub fn read<T: serde::de::DeserializeOwned>(
    &mut self,
  ) -> Result<T, SerializationError> {
    Ok(bincode::deserialize_from(&mut self.remaining)?)
  }

  pub fn is_empty(&self) -> bool {
    self.remaining.is_empty()
  }
}

/// Records persisted by the host's incremental build cache.
pub trait SerializableDependency: Sized {
  fn serialize(&self, writer: &mut ObjectWriter)
    -> Result<(), SerializationError>;
  fn deserialize(reader: &mut ObjectReader)
    -> Result<Self, SerializationError>;
}

impl SerializableDependency for ContextDependency {
  fn serialize(
    &self,
    writer: &mut ObjectWriter,
  ) -> Result<(), SerializationError> {
    writer.write(&self.options)?;
    writer.write(&self.range)?;
    writer.write(&self.optional)?;
    writer.write(&self.loc)
  }

  fn deserialize(
    reader: &mut ObjectReader,
  ) -> Result<Self, SerializationError> {
    Ok(Self {
      options: reader.read()?,
      range: reader.read()?,
      optional: reader.read()?,
      loc: reader.read()?,
    })
  }
}

impl SerializableDependency for UrlContextDependency {
  fn serialize(
    &self,
    writer: &mut ObjectWriter,
  ) -> Result<(), SerializationError> {
    writer.write(&self.value_range)?;
    self.base.serialize(writer)
  }

  fn deserialize(
    reader: &mut ObjectReader,
  ) -> Result<Self, SerializationError> {
    let value_range = reader.read()?;
    let base = ContextDependency::deserialize(reader)?;
    Ok(Self { value_range, base })
  }
}

impl SerializableDependency for StaticUrlDependency {
  fn serialize(
    &self,
    writer: &mut ObjectWriter,
  ) -> Result<(), SerializationError> {
    writer.write(&self.request)?;
    writer.write(&self.range_of_request_args)?;
    writer.write(&self.range)?;
    writer.write(&self.relative)?;
    writer.write(&self.used_by_exports)?;
    writer.write(&self.loc)
  }

  fn deserialize(
    reader: &mut ObjectReader,
  ) -> Result<Self, SerializationError> {
    Ok(Self {
      request: reader.read()?,
      range_of_request_args: reader.read()?,
      range: reader.read()?,
      relative: reader.read()?,
      used_by_exports: reader.read()?,
      loc: reader.read()?,
    })
  }
}

const URL_TAG: u8 = 0;
const CONTEXT_TAG: u8 = 1;

impl SerializableDependency for Dependency {
  fn serialize(
    &self,
    writer: &mut ObjectWriter,
  ) -> Result<(), SerializationError> {
    match self {
      Dependency::Url(dep) => {
        writer.write(&URL_TAG)?;
        dep.serialize(writer)
      }
      Dependency::Context(dep) => {
        writer.write(&CONTEXT_TAG)?;
        dep.serialize(writer)
      }
    }
  }

  fn deserialize(
    reader: &mut ObjectReader,
  ) -> Result<Self, SerializationError> {
    match reader.read::<u8>()? {
      URL_TAG => Ok(Dependency::Url(StaticUrlDependency::deserialize(reader)?)),
      CONTEXT_TAG => Ok(Dependency::Context(
        UrlContextDependency::deserialize(reader)?,
      )),
      tag => Err(SerializationError::UnknownTag(tag)),
    }
  }
}
