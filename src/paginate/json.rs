// std
use std::marker::PhantomData;
// crates.io
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
// self
use crate::{
	_prelude::*,
	error::DecodeError,
	paginate::{Page, PageContext, PageDecoder, PageToken},
};

/// How a JSON page announces its successor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NextPage {
	/// Boolean flag; the next token is `offset + page_size` while it is `true`.
	HasMore {
		/// Name of the flag field.
		field: String,
	},
	/// Server-issued cursor; `null`, absent, or empty ends the sequence.
	Cursor {
		/// Name of the cursor field.
		field: String,
	},
}

/// [`PageDecoder`] for JSON objects carrying an item array plus a continuation field.
pub struct JsonPageDecoder<T> {
	items_field: String,
	next: NextPage,
	_item: PhantomData<fn() -> T>,
}
impl<T> JsonPageDecoder<T> {
	/// Offset pagination: items under `items_field`, continuation via `has_more`.
	pub fn offset(items_field: impl Into<String>) -> Self {
		Self::new(items_field, NextPage::HasMore { field: "has_more".into() })
	}

	/// Cursor pagination: items under `items_field`, next cursor under `cursor_field`.
	pub fn cursor(items_field: impl Into<String>, cursor_field: impl Into<String>) -> Self {
		Self::new(items_field, NextPage::Cursor { field: cursor_field.into() })
	}

	/// Creates a decoder with an explicit continuation rule.
	pub fn new(items_field: impl Into<String>, next: NextPage) -> Self {
		Self { items_field: items_field.into(), next, _item: PhantomData }
	}

	fn next_token(
		&self,
		object: &Map<String, Value>,
		context: &PageContext<'_>,
	) -> Result<Option<PageToken>, DecodeError> {
		match &self.next {
			NextPage::HasMore { field } => match object.get(field) {
				Some(Value::Bool(true)) => context
					.offset
					.checked_add(u64::from(context.page_size))
					.map(|offset| Some(PageToken::Offset(offset)))
					.ok_or_else(|| DecodeError::InvalidField {
						field: field.clone(),
						reason: "next offset overflows u64".into(),
					}),
				Some(Value::Bool(false)) => Ok(None),
				Some(other) => Err(DecodeError::InvalidField {
					field: field.clone(),
					reason: format!("expected a boolean, found `{other}`"),
				}),
				None => Err(DecodeError::MissingField { field: field.clone() }),
			},
			NextPage::Cursor { field } => match object.get(field) {
				None | Some(Value::Null) => Ok(None),
				Some(Value::String(cursor)) if cursor.is_empty() => Ok(None),
				Some(Value::String(cursor)) => Ok(Some(PageToken::cursor(cursor.as_str()))),
				Some(Value::Number(cursor)) => Ok(Some(PageToken::cursor(cursor.to_string()))),
				Some(other) => Err(DecodeError::InvalidField {
					field: field.clone(),
					reason: format!("expected a string cursor, found `{other}`"),
				}),
			},
		}
	}
}
impl<T> Clone for JsonPageDecoder<T> {
	fn clone(&self) -> Self {
		Self::new(self.items_field.clone(), self.next.clone())
	}
}
impl<T> Debug for JsonPageDecoder<T> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("JsonPageDecoder")
			.field("items_field", &self.items_field)
			.field("next", &self.next)
			.finish()
	}
}
impl<T> PageDecoder for JsonPageDecoder<T>
where
	T: DeserializeOwned,
{
	type Item = T;

	fn decode_page(
		&self,
		context: &PageContext<'_>,
		body: &[u8],
	) -> Result<Page<Self::Item>, DecodeError> {
		let mut de = serde_json::Deserializer::from_slice(body);
		let value: Value = serde_path_to_error::deserialize(&mut de)?;

		de.end().map_err(DecodeError::TrailingData)?;

		let Value::Object(mut object) = value else {
			return Err(DecodeError::InvalidField {
				field: "$".into(),
				reason: "expected a JSON object".into(),
			});
		};
		let next = self.next_token(&object, context)?;
		let items = object
			.remove(&self.items_field)
			.ok_or_else(|| DecodeError::MissingField { field: self.items_field.clone() })?;
		let items = serde_path_to_error::deserialize(items)?;

		Ok(Page { items, next })
	}
}
