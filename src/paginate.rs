//! Lazy, forward-only pagination over offset or cursor contracts.
//!
//! A [`Pager`] issues one request per page, decodes it through a [`PageDecoder`], yields
//! the page's items in order, and follows the decoded next-page token until the server
//! stops returning one. Pages are fetched on demand: nothing is prefetched, and dropping
//! the pager stops further requests.

/// Page decoder for JSON bodies with `has_more` or cursor continuation.
pub mod json;

pub use json::*;

// std
use std::collections::VecDeque;
// crates.io
use futures::Stream;
// self
use crate::{
	_prelude::*,
	client::{ApiRequest, Client},
	error::DecodeError,
	obs::CallKind,
	transport::HttpTransport,
};

/// Position marker sent with the next page request.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageToken {
	/// Opaque server-issued cursor.
	Cursor(String),
	/// Absolute item offset.
	Offset(u64),
}
impl PageToken {
	/// Wraps a server-issued cursor.
	pub fn cursor(cursor: impl Into<String>) -> Self {
		Self::Cursor(cursor.into())
	}

	/// Builds an offset token.
	pub fn offset(offset: u64) -> Self {
		Self::Offset(offset)
	}

	/// Empty cursors carry no position and end the sequence.
	pub fn is_empty(&self) -> bool {
		matches!(self, Self::Cursor(cursor) if cursor.is_empty())
	}
}
impl Display for PageToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Cursor(cursor) => write!(f, "cursor `{cursor}`"),
			Self::Offset(offset) => write!(f, "offset {offset}"),
		}
	}
}

/// Endpoint, page size, and parameter names driving a page sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct PageRequest {
	/// Request template; pagination parameters are overwritten per page.
	pub endpoint: ApiRequest,
	/// Items requested per page, fixed for the sequence's lifetime.
	pub page_size: u32,
	/// Offset sent with the first request.
	pub start_offset: u64,
	/// Query parameter carrying the page size.
	pub limit_param: String,
	/// Query parameter carrying an offset token.
	pub offset_param: String,
	/// Query parameter carrying a cursor token.
	pub cursor_param: String,
}
impl PageRequest {
	/// Creates a request using the `limit`/`offset`/`cursor` parameter names.
	pub fn new(endpoint: ApiRequest, page_size: u32) -> Self {
		Self {
			endpoint,
			page_size,
			start_offset: 0,
			limit_param: "limit".into(),
			offset_param: "offset".into(),
			cursor_param: "cursor".into(),
		}
	}

	/// Overrides the offset sent with the first request.
	pub fn with_start_offset(mut self, offset: u64) -> Self {
		self.start_offset = offset;

		self
	}

	/// Overrides the page-size parameter name.
	pub fn with_limit_param(mut self, name: impl Into<String>) -> Self {
		self.limit_param = name.into();

		self
	}

	/// Overrides the offset parameter name.
	pub fn with_offset_param(mut self, name: impl Into<String>) -> Self {
		self.offset_param = name.into();

		self
	}

	/// Overrides the cursor parameter name.
	pub fn with_cursor_param(mut self, name: impl Into<String>) -> Self {
		self.cursor_param = name.into();

		self
	}

	/// Builds the concrete request for the page identified by `token`.
	///
	/// `None` denotes the first page, which carries the starting offset.
	pub fn request_for(&self, token: Option<&PageToken>) -> ApiRequest {
		let mut request = self.endpoint.clone();

		request.set_query(&self.limit_param, self.page_size);

		match token {
			None => {
				request.remove_query(&self.cursor_param);
				request.set_query(&self.offset_param, self.start_offset);
			},
			Some(PageToken::Offset(offset)) => {
				request.remove_query(&self.cursor_param);
				request.set_query(&self.offset_param, offset);
			},
			Some(PageToken::Cursor(cursor)) => {
				request.remove_query(&self.offset_param);
				request.set_query(&self.cursor_param, cursor);
			},
		}

		request
	}
}

/// What a decoder knows about the page it is decoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageContext<'a> {
	/// Token that produced this page; `None` for the first page.
	pub token: Option<&'a PageToken>,
	/// Offset of the page's first item.
	pub offset: u64,
	/// Page size requested.
	pub page_size: u32,
}

/// One decoded page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page<T> {
	/// Items in server order.
	pub items: Vec<T>,
	/// Token for the following page; `None` ends the sequence.
	pub next: Option<PageToken>,
}

/// Turns a raw page body into ordered items plus the next-page token.
pub trait PageDecoder {
	/// Item type yielded by the pager.
	type Item;

	/// Decodes one page body.
	fn decode_page(
		&self,
		context: &PageContext<'_>,
		body: &[u8],
	) -> Result<Page<Self::Item>, DecodeError>;
}

/// Lazy sequence of items spread over server pages.
///
/// Consume it with [`next`](Pager::next), [`into_stream`](Pager::into_stream), or
/// [`try_collect`](Pager::try_collect). After an error or the last page, `next` keeps
/// returning `None`.
pub struct Pager<T, C>
where
	C: ?Sized + HttpTransport,
{
	client: Client<C>,
	request: PageRequest,
	decoder: Box<dyn PageDecoder<Item = T> + Send + Sync>,
	buffer: VecDeque<T>,
	state: PagerState,
	items_fetched: u64,
	items_yielded: u64,
	pages_fetched: u64,
}
impl<T, C> Pager<T, C>
where
	C: ?Sized + HttpTransport,
{
	pub(crate) fn new(
		client: Client<C>,
		request: PageRequest,
		decoder: Box<dyn PageDecoder<Item = T> + Send + Sync>,
	) -> Self {
		Self {
			client,
			request,
			decoder,
			buffer: VecDeque::new(),
			state: PagerState::Start,
			items_fetched: 0,
			items_yielded: 0,
			pages_fetched: 0,
		}
	}

	/// Number of pages fetched so far.
	pub fn pages_fetched(&self) -> u64 {
		self.pages_fetched
	}

	/// Number of items handed to the caller so far.
	pub fn items_yielded(&self) -> u64 {
		self.items_yielded
	}

	/// Returns `true` once the sequence has ended and the buffer is drained.
	pub fn is_done(&self) -> bool {
		matches!(self.state, PagerState::Done) && self.buffer.is_empty()
	}

	/// Yields the next item, fetching the next page when the current one is drained.
	///
	/// Cancelling the returned future before it resolves leaves the pager on the same
	/// page, so a later call re-fetches it.
	pub async fn next(&mut self) -> Option<Result<T>> {
		loop {
			if let Some(item) = self.buffer.pop_front() {
				self.items_yielded += 1;

				return Some(Ok(item));
			}

			let token = match &self.state {
				PagerState::Done => return None,
				PagerState::Start => None,
				PagerState::Next(token) => Some(token.clone()),
			};

			match self.fetch(token).await {
				Ok(page) => {
					self.pages_fetched += 1;
					self.items_fetched += page.items.len() as u64;
					self.buffer.extend(page.items);
					self.state = match page.next {
						Some(next) if !next.is_empty() => PagerState::Next(next),
						_ => PagerState::Done,
					};
				},
				Err(e) => {
					self.state = PagerState::Done;

					return Some(Err(e));
				},
			}
		}
	}

	/// Drains the sequence into a vector, stopping at the first error.
	pub async fn try_collect(mut self) -> Result<Vec<T>> {
		let mut items = Vec::new();

		while let Some(item) = self.next().await {
			items.push(item?);
		}

		Ok(items)
	}

	/// Converts the pager into a [`Stream`] of items.
	pub fn into_stream(self) -> impl Stream<Item = Result<T>> {
		futures::stream::unfold(self, |mut pager| async move {
			let item = pager.next().await?;

			Some((item, pager))
		})
	}

	async fn fetch(&self, token: Option<PageToken>) -> Result<Page<T>> {
		let request = self.request.request_for(token.as_ref());
		let response = self.client.execute(&request, CallKind::Page).await?;
		let offset = match &token {
			None => self.request.start_offset,
			Some(PageToken::Offset(offset)) => *offset,
			Some(PageToken::Cursor(_)) =>
				self.request.start_offset.saturating_add(self.items_fetched),
		};
		let context =
			PageContext { token: token.as_ref(), offset, page_size: self.request.page_size };

		self.decoder
			.decode_page(&context, response.body())
			.map_err(|source| Error::Decode { page_token: token.clone(), source })
	}
}
impl<T, C> Debug for Pager<T, C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Pager")
			.field("path", &self.request.endpoint.path)
			.field("page_size", &self.request.page_size)
			.field("state", &self.state)
			.field("buffered", &self.buffer.len())
			.field("pages_fetched", &self.pages_fetched)
			.field("items_yielded", &self.items_yielded)
			.finish()
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum PagerState {
	Start,
	Next(PageToken),
	Done,
}
