// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A [`serde`] deserializer for the fixed-layout records of an MFS volume.
//!
//! Multi-byte integers are big-endian, as everywhere on the 68000. Records are plain sequences of
//! fields with no framing, so structs, tuples and arrays all decode as "the next `n` values".

use std::fmt;

use serde::de;

/// Decodes a `T` from the front of `input`. Trailing bytes are ignored.
pub fn from_bytes<'de, T>(input: &'de [u8]) -> Result<T, DeserializeError>
where
    T: de::Deserialize<'de>,
{
    let mut de = Deserializer::from_bytes(input);

    T::deserialize(&mut de)
}

#[derive(Debug)]
pub enum DeserializeError {
    Message(String),
    ExpectedU8,
    ExpectedU16,
    ExpectedU32,
    ExpectedI16,
    /// The record type asked for a value that never appears on disk.
    Unsupported(&'static str),
}

impl de::Error for DeserializeError {
    fn custom<T>(msg: T) -> Self
    where
        T: fmt::Display,
    {
        Self::Message(msg.to_string())
    }
}

impl de::StdError for DeserializeError {}

impl fmt::Display for DeserializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Message(msg) => f.write_str(msg),
            Self::ExpectedU8 => f.write_str("expected an 8-bit integer"),
            Self::ExpectedU16 => f.write_str("expected a 16-bit integer"),
            Self::ExpectedU32 => f.write_str("expected a 32-bit integer"),
            Self::ExpectedI16 => f.write_str("expected a signed 16-bit integer"),
            Self::Unsupported(what) => write!(f, "`{}` is not supported", what),
        }
    }
}

impl<'de> Deserializer<'de> {
    pub fn from_bytes(input: &'de [u8]) -> Self {
        Self { input }
    }
}

#[derive(Debug)]
pub struct Deserializer<'de> {
    input: &'de [u8],
}

impl<'de> Deserializer<'de> {
    /// The bytes not yet consumed.
    #[cfg(test)]
    pub fn remaining(&self) -> &'de [u8] {
        self.input
    }

    fn take<const N: usize>(&mut self, err: DeserializeError) -> Result<[u8; N], DeserializeError> {
        let (head, tail) = self.input.split_first_chunk::<N>().ok_or(err)?;
        self.input = tail;

        Ok(*head)
    }
}

macro_rules! def_deserialize_unsupported {
    ($lt:lifetime $($fn:ident($($arg:ty),* $(,)?))*) => {
        $(
            fn $fn<V>(self, $(_: $arg,)* _: V) -> Result<V::Value, DeserializeError>
            where
                V: de::Visitor<$lt>,
            {
                Err(DeserializeError::Unsupported(stringify!($fn)))
            }
        )*
    };
}

macro_rules! def_deserialize_big_endian {
    (
        fn: $fn:ident<$lt:lifetime> -> Result<$ty:ty, $exp:ident $(,)?>,
        visit: $visit:ident $(,)?
    ) => {
        fn $fn<V>(self, visitor: V) -> Result<V::Value, DeserializeError>
        where
            V: de::Visitor<$lt>,
        {
            const TYPE_SIZE: usize = std::mem::size_of::<$ty>();

            let it = self.take::<TYPE_SIZE>(DeserializeError::$exp)?;

            visitor.$visit(<$ty>::from_be_bytes(it))
        }
    };
}

impl<'de, 'a> de::Deserializer<'de> for &'a mut Deserializer<'de> {
    type Error = DeserializeError;

    def_deserialize_unsupported! {
        'de
        deserialize_any()
        deserialize_bool()
        deserialize_i8()
        deserialize_i32()
        deserialize_i64()
        deserialize_u64()
        deserialize_f32()
        deserialize_f64()
        deserialize_char()
        deserialize_str()
        deserialize_string()
        deserialize_bytes()
        deserialize_byte_buf()
        deserialize_option()
        deserialize_unit()
        deserialize_tuple_struct(&'static str, usize)
        deserialize_enum(&'static str, &'static [&'static str])
        deserialize_unit_struct(&'static str)
        deserialize_seq()
        deserialize_map()
        deserialize_identifier()
        deserialize_ignored_any()
    }

    fn deserialize_u8<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        let [it] = self.take::<1>(DeserializeError::ExpectedU8)?;

        visitor.visit_u8(it)
    }

    def_deserialize_big_endian! {
        fn: deserialize_u16<'de> -> Result<u16, ExpectedU16>,
        visit: visit_u16,
    }

    def_deserialize_big_endian! {
        fn: deserialize_u32<'de> -> Result<u32, ExpectedU32>,
        visit: visit_u32,
    }

    // QuickDraw coordinates are the only signed fields.
    def_deserialize_big_endian! {
        fn: deserialize_i16<'de> -> Result<i16, ExpectedI16>,
        visit: visit_i16,
    }

    fn deserialize_newtype_struct<V>(
        self,
        _: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_struct<V>(
        self,
        _: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        // A struct is essentially a named tuple.
        self.deserialize_tuple(fields.len(), visitor)
    }

    fn deserialize_tuple<V>(self, len: usize, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: de::Visitor<'de>,
    {
        struct Access<'a, 'de> {
            de: &'a mut Deserializer<'de>,
            len: usize,
        }

        impl<'de> de::SeqAccess<'de> for Access<'_, 'de> {
            type Error = DeserializeError;

            fn next_element_seed<T>(
                &mut self,
                seed: T,
            ) -> Result<Option<T::Value>, DeserializeError>
            where
                T: de::DeserializeSeed<'de>,
            {
                if self.len > 0 {
                    self.len -= 1;
                    let value = seed.deserialize(&mut *self.de)?;

                    Ok(Some(value))
                } else {
                    Ok(None)
                }
            }

            fn size_hint(&self) -> Option<usize> {
                Some(self.len)
            }
        }

        visitor.visit_seq(Access { de: self, len })
    }
}
