// crates.io
use httpmock::prelude::*;
// self
use travel_desk::{
	_preludet::*,
	desk::{Envelope, RequestContext},
	gateway::{
		FLIGHT_OFFERS_PATH, FlightSearchParams, HOTEL_OFFERS_PATH, HOTELS_BY_CITY_PATH,
		HotelSearchParams, LOCATIONS_PATH, SearchOutcome,
	},
	identity::ClientIdentity,
	oauth::TOKEN_PATH,
	relay::SelectionKind,
	store::TtlStore,
};

async fn mock_token(server: &MockServer) {
	server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200).header("content-type", "application/json").body(
				json!({ "access_token": "desk-token", "token_type": "bearer", "expires_in": 1799 })
					.to_string(),
			);
		})
		.await;
}

fn context(desk: &ReqwestTestDesk, identity: ClientIdentity) -> RequestContext {
	let nonce = desk.issue_nonce(&identity);

	RequestContext::new("203.0.113.7", identity, nonce)
}

fn flight_offer() -> String {
	json!({
		"id": "7",
		"itineraries": [{
			"segments": [
				{ "departure": { "iataCode": "JFK" }, "arrival": { "iataCode": "ORD" } },
				{ "departure": { "iataCode": "ORD" }, "arrival": { "iataCode": "LAX" } }
			]
		}],
		"price": { "total": "199.00", "currency": "USD" }
	})
	.to_string()
}

async fn mock_location_names(server: &MockServer) {
	for (code, name) in [("JFK", "JOHN F KENNEDY INTL"), ("LAX", "LOS ANGELES INTL")] {
		server
			.mock_async(|when, then| {
				when.method(GET).path(LOCATIONS_PATH).query_param("keyword", code);
				then.status(200).header("content-type", "application/json").body(
					json!({
						"data": [
							{ "iataCode": format!("{code}X"), "name": "DECOY" },
							{ "iataCode": code, "name": name }
						]
					})
					.to_string(),
				);
			})
			.await;
	}
}

fn hotel_list(count: usize) -> String {
	let hotels = (1..=count).map(|i| json!({ "hotelId": format!("HT{i:04}") })).collect::<Vec<_>>();

	json!({ "data": hotels }).to_string()
}

#[tokio::test]
async fn flight_selection_round_trips_through_the_relay() {
	let server = MockServer::start_async().await;
	let (desk, _harness) = build_reqwest_test_desk(test_settings(&server.base_url()));
	let (identity, cookie) = ClientIdentity::resolve(None, None);
	let ctx = context(&desk, identity);

	assert!(cookie.is_some());

	mock_token(&server).await;
	mock_location_names(&server).await;

	let selection =
		desk.select_flight(&ctx, &flight_offer()).await.expect("Selection should succeed.");

	assert_eq!(selection.redirect_url.as_str(), "https://travel.example.com/booking");
	assert_eq!(selection.offer["originLocationName"], "JOHN F KENNEDY INTL");
	assert_eq!(selection.offer["destinationLocationName"], "LOS ANGELES INTL");

	let stored = desk
		.retrieve_selection(&ctx, SelectionKind::Flight)
		.await
		.expect("Retrieve should succeed.");

	assert_eq!(stored.as_ref(), Some(&selection.offer));
	assert!(
		desk.retrieve_selection(&ctx, SelectionKind::Hotel)
			.await
			.expect("Retrieve should succeed.")
			.is_none()
	);
	assert!(
		desk.clear_selection(&ctx, SelectionKind::Flight).await.expect("Clear should succeed.")
	);
	assert!(
		desk.retrieve_selection(&ctx, SelectionKind::Flight)
			.await
			.expect("Retrieve should succeed.")
			.is_none()
	);
}

#[tokio::test]
async fn selection_expires_after_an_hour() {
	let server = MockServer::start_async().await;
	let (desk, harness) = build_reqwest_test_desk(test_settings(&server.base_url()));
	let ctx = context(&desk, ClientIdentity::User(12));

	mock_token(&server).await;
	mock_location_names(&server).await;
	desk.select_flight(&ctx, &flight_offer()).await.expect("Selection should succeed.");
	harness.clock.advance(Duration::minutes(59));

	assert!(
		desk.retrieve_selection(&ctx, SelectionKind::Flight)
			.await
			.expect("Retrieve should succeed.")
			.is_some()
	);

	harness.clock.advance(Duration::minutes(1));

	assert!(
		desk.retrieve_selection(&ctx, SelectionKind::Flight)
			.await
			.expect("Retrieve should succeed.")
			.is_none()
	);
}

#[tokio::test]
async fn selection_is_stored_even_without_booking_page() {
	let server = MockServer::start_async().await;
	let mut settings = test_settings(&server.base_url());

	settings.booking_page_url = None;

	let (desk, _harness) = build_reqwest_test_desk(settings);
	let ctx = context(&desk, ClientIdentity::User(3));

	mock_token(&server).await;
	mock_location_names(&server).await;

	let err = desk
		.select_flight(&ctx, &flight_offer())
		.await
		.expect_err("Missing booking page should fail.");

	assert!(matches!(err, Error::Config(_)));
	assert!(
		desk.retrieve_selection(&ctx, SelectionKind::Flight)
			.await
			.expect("Retrieve should succeed.")
			.is_some()
	);
}

#[tokio::test]
async fn malformed_offers_are_rejected() {
	let server = MockServer::start_async().await;
	let (desk, _harness) = build_reqwest_test_desk(test_settings(&server.base_url()));
	let ctx = context(&desk, ClientIdentity::User(4));
	let empty: Envelope<Value> = desk.select_hotel(&ctx, "").await.into();
	let invalid: Envelope<Value> = desk.select_hotel(&ctx, "\"just text\"").await.into();

	assert_eq!(
		serde_json::to_value(&empty).expect("Envelope should serialize."),
		json!({ "success": false, "data": { "message": "No hotel offer data received." } })
	);
	assert_eq!(
		serde_json::to_value(&invalid).expect("Envelope should serialize."),
		json!({ "success": false, "data": { "message": "Invalid hotel offer data format." } })
	);
}

#[tokio::test]
async fn forged_nonce_blocks_every_checked_action() {
	let server = MockServer::start_async().await;
	let (desk, _harness) = build_reqwest_test_desk(test_settings(&server.base_url()));
	let identity = ClientIdentity::User(5);
	let other_nonce = desk.issue_nonce(&ClientIdentity::User(6));
	let ctx = RequestContext::new("203.0.113.7", identity, other_nonce);
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(500);
		})
		.await;

	assert!(matches!(desk.search_locations(&ctx, "LONDON").await, Err(Error::InvalidNonce)));
	assert!(matches!(desk.select_flight(&ctx, &flight_offer()).await, Err(Error::InvalidNonce)));
	assert!(matches!(
		desk.clear_selection(&ctx, SelectionKind::Flight).await,
		Err(Error::InvalidNonce)
	));
	assert!(matches!(desk.select_hotel(&ctx, "{}").await, Err(Error::InvalidNonce)));
	token.assert_calls_async(0).await;
}

#[tokio::test]
async fn hotel_actions_respect_the_feature_flag() {
	let server = MockServer::start_async().await;
	let mut settings = test_settings(&server.base_url());

	settings.hotel_search_enabled = false;

	let (desk, _harness) = build_reqwest_test_desk(settings);
	let ctx = context(&desk, ClientIdentity::User(8));
	let params = HotelSearchParams::new("PAR", "2025-12-01", "2025-12-03");

	assert!(matches!(
		desk.search_hotel_locations(&ctx, "Paris").await,
		Err(Error::FeatureDisabled { .. })
	));
	assert!(matches!(desk.search_hotels(&ctx, &params).await, Err(Error::FeatureDisabled { .. })));
	assert!(matches!(
		desk.search_hotels_page(&ctx, &params).await,
		Err(Error::FeatureDisabled { .. })
	));
	assert!(matches!(desk.select_hotel(&ctx, "{}").await, Err(Error::FeatureDisabled { .. })));
}

#[tokio::test]
async fn location_search_is_rate_limited_per_window() {
	let server = MockServer::start_async().await;
	let (desk, harness) = build_reqwest_test_desk(test_settings(&server.base_url()));
	let ctx = context(&desk, ClientIdentity::User(9));

	mock_token(&server).await;

	let mock = server
		.mock_async(|when, then| {
			when.method(GET).path(LOCATIONS_PATH);
			then.status(200).header("content-type", "application/json").body(
				json!({
					"data": [{
						"subType": "CITY",
						"name": "LONDON",
						"iataCode": "LON",
						"address": { "cityName": "LONDON", "countryCode": "GB" }
					}]
				})
				.to_string(),
			);
		})
		.await;

	for _ in 0..20 {
		let outcome =
			desk.search_locations(&ctx, "lon").await.expect("Budgeted search should succeed.");
		let suggestions = outcome.found().expect("Search should find London.");

		assert_eq!(suggestions[0].label, "LONDON (LON), LONDON");
	}

	let denied = desk
		.search_locations(&ctx, "lon")
		.await
		.expect_err("The 21st search in a window should be denied.");

	assert!(matches!(denied, Error::RateLimited { .. }));
	assert_eq!(denied.user_message(), "Too many requests. Please try again later.");
	mock.assert_calls_async(20).await;

	harness.clock.advance(Duration::seconds(60));

	desk.search_locations(&ctx, "lon").await.expect("A new window should allow searches.");
	mock.assert_calls_async(21).await;
}

#[tokio::test]
async fn short_keywords_are_rejected() {
	let server = MockServer::start_async().await;
	let (desk, _harness) = build_reqwest_test_desk(test_settings(&server.base_url()));
	let ctx = context(&desk, ClientIdentity::User(10));
	let envelope: Envelope<_> = desk.search_locations(&ctx, "lo").await.into();

	assert_eq!(
		serde_json::to_value(&envelope).expect("Envelope should serialize."),
		json!({
			"success": false,
			"data": { "message": "Search term must be at least 3 characters." }
		})
	);
	assert!(matches!(
		desk.search_hotel_locations(&ctx, "p").await,
		Err(Error::InvalidInput { .. })
	));
}

#[tokio::test]
async fn flight_search_without_offers_reports_no_results() {
	let server = MockServer::start_async().await;
	let (desk, _harness) = build_reqwest_test_desk(test_settings(&server.base_url()));
	let ctx = context(&desk, ClientIdentity::User(11));

	mock_token(&server).await;

	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(FLIGHT_OFFERS_PATH).json_body_includes(
				json!({
					"originDestinations": [
						{ "id": "1", "originLocationCode": "JFK" },
						{ "id": "2", "originLocationCode": "LAX" }
					],
					"searchCriteria": {
						"flightFilters": {
							"connectionRestriction": { "maxNumberOfConnections": 0 }
						}
					}
				})
				.to_string(),
			);
			then.status(200).header("content-type", "application/json").body("{\"data\":[]}");
		})
		.await;
	let params: FlightSearchParams = serde_json::from_value(json!({
		"originLocationCode": "JFK",
		"destinationLocationCode": "LAX",
		"departureDate": "2025-12-01",
		"returnDate": "2025-12-08",
		"adults": "1",
		"nonStop": "true"
	}))
	.expect("Form input should decode.");
	let outcome = desk.search_flights(&ctx, &params).await.expect("Search should succeed.");

	assert_eq!(outcome, SearchOutcome::NoResults);
	assert_eq!(
		serde_json::to_value(Envelope::success(outcome)).expect("Envelope should serialize."),
		json!({ "success": true, "data": { "status": "no_results" } })
	);
	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn flight_search_keeps_dictionaries_and_meta() {
	let server = MockServer::start_async().await;
	let (desk, _harness) = build_reqwest_test_desk(test_settings(&server.base_url()));
	let ctx = context(&desk, ClientIdentity::User(12));
	let body = json!({
		"meta": { "count": 1 },
		"data": [{ "id": "1", "validatingAirlineCodes": ["TK"] }],
		"dictionaries": { "carriers": { "TK": "TURKISH AIRLINES" } }
	});

	mock_token(&server).await;
	server
		.mock_async(|when, then| {
			when.method(POST).path(FLIGHT_OFFERS_PATH);
			then.status(200).header("content-type", "application/json").body(body.to_string());
		})
		.await;

	let outcome = desk
		.search_flights(&ctx, &FlightSearchParams::one_way("IST", "LHR", "2025-12-01"))
		.await
		.expect("Search should succeed.");
	let response = outcome.found().expect("Offers should be found.");

	assert_eq!(response["dictionaries"]["carriers"]["TK"], "TURKISH AIRLINES");
	assert_eq!(response["meta"]["count"], 1);
	assert_eq!(response, body);
}

#[tokio::test]
async fn hotel_search_reports_batch_statistics() {
	let server = MockServer::start_async().await;
	let (desk, _harness) = build_reqwest_test_desk(test_settings(&server.base_url()));
	let ctx = context(&desk, ClientIdentity::User(13));

	mock_token(&server).await;
	server
		.mock_async(|when, then| {
			when.method(GET).path(HOTELS_BY_CITY_PATH).query_param("cityCode", "PAR");
			then.status(200).header("content-type", "application/json").body(hotel_list(80));
		})
		.await;

	let offers = server
		.mock_async(|when, then| {
			when.method(GET).path(HOTEL_OFFERS_PATH);
			then.status(200).header("content-type", "application/json").body(
				json!({ "data": [{ "type": "hotel-offers" }, { "type": "hotel-offers" }] })
					.to_string(),
			);
		})
		.await;
	let outcome = desk
		.search_hotels(&ctx, &HotelSearchParams::new("PAR", "2025-12-01", "2025-12-03"))
		.await
		.expect("Hotel search should succeed.");
	let result = outcome.found().expect("Offers should be found.");

	assert_eq!(result.offers.len(), 2);
	assert_eq!(
		serde_json::to_value(result.meta).expect("Meta should serialize."),
		json!({ "totalHotelsInCity": 80, "hotelsSearched": 50, "offersFound": 2 })
	);
	offers.assert_calls_async(1).await;
}

#[tokio::test]
async fn hotel_pages_walk_the_city_list() {
	let server = MockServer::start_async().await;
	let (desk, _harness) = build_reqwest_test_desk(test_settings(&server.base_url()));
	let ctx = context(&desk, ClientIdentity::User(14));
	let second_page = (51..=80).map(|i| format!("HT{i:04}")).collect::<Vec<_>>().join(",");

	mock_token(&server).await;
	server
		.mock_async(|when, then| {
			when.method(GET).path(HOTELS_BY_CITY_PATH);
			then.status(200).header("content-type", "application/json").body(hotel_list(80));
		})
		.await;

	let offers = server
		.mock_async(|when, then| {
			when.method(GET).path(HOTEL_OFFERS_PATH).query_param("hotelIds", second_page.as_str());
			then.status(200).header("content-type", "application/json").body("{\"data\":[]}");
		})
		.await;
	let mut params = HotelSearchParams::new("PAR", "2025-12-01", "2025-12-03");

	params.page = 2;

	let page = desk
		.search_hotels_page(&ctx, &params)
		.await
		.expect("Page search should succeed.")
		.found()
		.expect("The second page exists.");

	assert!(page.offers.is_empty());
	assert_eq!(
		serde_json::to_value(page.pagination).expect("Pagination should serialize."),
		json!({
			"currentPage": 2,
			"totalHotels": 80,
			"hotelsPerPage": 50,
			"totalPages": 2,
			"hasMore": false
		})
	);
	offers.assert_calls_async(1).await;

	params.page = 3;

	assert!(
		desk.search_hotels_page(&ctx, &params)
			.await
			.expect("Out-of-range page should not fail.")
			.is_empty()
	);
}

#[tokio::test]
async fn hotel_cities_keep_only_city_entries() {
	let server = MockServer::start_async().await;
	let (desk, _harness) = build_reqwest_test_desk(test_settings(&server.base_url()));
	let ctx = context(&desk, ClientIdentity::User(15));

	mock_token(&server).await;
	server
		.mock_async(|when, then| {
			when.method(GET)
				.path(LOCATIONS_PATH)
				.query_param("subType", "CITY")
				.query_param("keyword", "PA");
			then.status(200).header("content-type", "application/json").body(
				json!({
					"data": [
						{ "subType": "AIRPORT", "name": "CHARLES DE GAULLE", "iataCode": "CDG" },
						{
							"subType": "CITY",
							"name": "PARIS",
							"iataCode": "PAR",
							"address": { "countryCode": "FR" }
						}
					]
				})
				.to_string(),
			);
		})
		.await;

	let cities = desk
		.search_hotel_locations(&ctx, "pa")
		.await
		.expect("City search should succeed.")
		.found()
		.expect("Paris should be suggested.");

	assert_eq!(cities.len(), 1);
	assert_eq!(cities[0].label, "PARIS, FR");
	assert_eq!(cities[0].value, "PARIS");
}

#[tokio::test]
async fn hotel_selection_is_scoped_to_the_guest_session() {
	let server = MockServer::start_async().await;
	let (desk, harness) = build_reqwest_test_desk(test_settings(&server.base_url()));
	let (guest, _) = ClientIdentity::resolve(None, Some("guest-session-1"));
	let ctx = context(&desk, guest);
	let offer = desk
		.select_hotel(&ctx, r#"{ "hotel": { "name": "LE GRAND" } }"#)
		.await
		.expect("Hotel selection should succeed.");

	assert_eq!(offer["hotel"]["name"], "LE GRAND");
	assert_eq!(
		harness
			.store
			.get("travel_desk:selected_hotel:guest_guest-session-1")
			.await
			.expect("Store read should succeed."),
		Some(offer)
	);
}
