//! Hotel actions, available only while hotel search is enabled in the settings.

// self
use crate::{
	_prelude::*,
	desk::{RequestContext, TravelDesk, parse_offer},
	gateway::{self, HotelSearchParams, Location, MAX_HOTELS_PER_REQUEST, SearchOutcome},
	http::ApiHttpClient,
	oauth::TransportErrorMapper,
	obs::{self, ActionKind},
};

const MIN_CITY_KEYWORD: usize = 2;

/// Autocomplete entry for the hotel city picker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CitySuggestion {
	/// Display text, `Name, CC`.
	pub label: String,
	/// City name submitted by the picker.
	pub value: String,
	/// City IATA code.
	pub iata_code: Option<String>,
}

/// Offers found by [`TravelDesk::search_hotels`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HotelSearchResult {
	/// Offer entries.
	pub offers: Vec<Value>,
	/// Search statistics.
	pub meta: HotelSearchMeta,
}

/// Statistics of a hotel search.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HotelSearchMeta {
	/// Hotels listed in the city.
	pub total_hotels_in_city: usize,
	/// Hotels whose offers were requested.
	pub hotels_searched: usize,
	/// Offers returned.
	pub offers_found: usize,
}

/// One page of [`TravelDesk::search_hotels_page`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HotelPage {
	/// Offer entries; may be empty when no hotel on the page has availability.
	pub offers: Vec<Value>,
	/// Position of the page within the city's hotel list.
	pub pagination: Pagination,
}

/// Page position metadata.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
	/// One-based page number.
	pub current_page: u32,
	/// Hotels listed in the city.
	pub total_hotels: usize,
	/// Page size.
	pub hotels_per_page: usize,
	/// Number of pages.
	pub total_pages: usize,
	/// Whether a later page exists.
	pub has_more: bool,
}
impl Pagination {
	/// Computes the position of `page` (one-based) over `total_hotels` hotels.
	pub fn new(current_page: u32, total_hotels: usize, hotels_per_page: usize) -> Self {
		let mut pagination = Self {
			current_page,
			total_hotels,
			hotels_per_page,
			total_pages: total_hotels.div_ceil(hotels_per_page),
			has_more: false,
		};

		pagination.has_more = pagination.offset() + hotels_per_page < total_hotels;

		pagination
	}

	/// Index of the page's first hotel.
	pub fn offset(&self) -> usize {
		(self.current_page.max(1) as usize - 1) * self.hotels_per_page
	}
}

impl<C, M> TravelDesk<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Suggests cities for a keyword of at least two characters.
	pub async fn search_hotel_locations(
		&self,
		ctx: &RequestContext,
		keyword: &str,
	) -> Result<SearchOutcome<Vec<CitySuggestion>>> {
		obs::observe(ActionKind::SearchHotelLocations, "handle", async {
			self.ensure_hotels_enabled()?;
			self.verify(ctx)?;

			let keyword = keyword.trim();

			if keyword.chars().count() < MIN_CITY_KEYWORD {
				return Err(Error::invalid_input(format!(
					"Search term must be at least {MIN_CITY_KEYWORD} characters"
				)));
			}

			let suggestions = gateway::data_items(self.gateway.search_hotel_cities(keyword).await?)
				.iter()
				.map(Location::from_value)
				.filter(|location| location.sub_type.as_deref() == Some(gateway::CITY))
				.map(city_suggestion)
				.collect::<Vec<_>>();

			Ok(if suggestions.is_empty() {
				SearchOutcome::NoResults
			} else {
				SearchOutcome::Found(suggestions)
			})
		})
		.await
	}

	/// Finds offers in a city, searching the first batch of its hotels.
	pub async fn search_hotels(
		&self,
		ctx: &RequestContext,
		params: &HotelSearchParams,
	) -> Result<SearchOutcome<HotelSearchResult>> {
		obs::observe(ActionKind::SearchHotels, "handle", async {
			self.ensure_hotels_enabled()?;
			self.verify(ctx)?;

			let (city_code, stay) = params.validate()?;
			let hotel_ids = self.gateway.hotel_ids_by_city(&city_code).await?;

			if hotel_ids.is_empty() {
				return Ok(SearchOutcome::NoResults);
			}

			let batch = self.gateway.search_hotel_offers_batched(&hotel_ids, &stay).await?;

			if batch.offers.is_empty() {
				return Ok(SearchOutcome::NoResults);
			}

			let meta = HotelSearchMeta {
				total_hotels_in_city: hotel_ids.len(),
				hotels_searched: batch.hotels_searched,
				offers_found: batch.offers.len(),
			};

			Ok(SearchOutcome::Found(HotelSearchResult { offers: batch.offers, meta }))
		})
		.await
	}

	/// Finds offers for one page of a city's hotels.
	///
	/// Pages hold [`MAX_HOTELS_PER_REQUEST`] hotels; page 0 is treated as the first page.
	pub async fn search_hotels_page(
		&self,
		ctx: &RequestContext,
		params: &HotelSearchParams,
	) -> Result<SearchOutcome<HotelPage>> {
		obs::observe(ActionKind::SearchHotelsPage, "handle", async {
			self.ensure_hotels_enabled()?;
			self.verify(ctx)?;

			let (city_code, stay) = params.validate()?;
			let hotel_ids = self.gateway.hotel_ids_by_city(&city_code).await?;
			let pagination =
				Pagination::new(params.page.max(1), hotel_ids.len(), MAX_HOTELS_PER_REQUEST);
			let offset = pagination.offset();

			if offset >= hotel_ids.len() {
				return Ok(SearchOutcome::NoResults);
			}

			let page_ids = &hotel_ids[offset..hotel_ids.len().min(offset + MAX_HOTELS_PER_REQUEST)];
			let response = self.gateway.search_hotel_offers(page_ids, &stay).await?;

			let offers = gateway::data_items(response);

			Ok(SearchOutcome::Found(HotelPage { offers, pagination }))
		})
		.await
	}

	/// Stores the chosen hotel offer and returns it.
	pub async fn select_hotel(&self, ctx: &RequestContext, offer_json: &str) -> Result<Value> {
		obs::observe(ActionKind::SelectHotel, "handle", async {
			self.ensure_hotels_enabled()?;
			self.verify(ctx)?;

			let offer = parse_offer(offer_json, "hotel")?;

			self.hotels.store(&ctx.identity, offer.clone()).await?;

			Ok(offer)
		})
		.await
	}
}

fn city_suggestion(location: Location) -> CitySuggestion {
	let name = location.name.clone().unwrap_or_default();
	let label = match location.country_code() {
		Some(country) => format!("{name}, {country}"),
		None => name.clone(),
	};

	CitySuggestion { label, value: name, iata_code: location.iata_code }
}
