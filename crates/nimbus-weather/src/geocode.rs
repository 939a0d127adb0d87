//! Reverse geocoding: convert coordinates to a place description.
//! Speaks the OpenCage response format; the first candidate wins.

use std::time::Duration;

use async_trait::async_trait;
use nimbus_core::{EmptyResultPolicy, GeocodeConfig, ReqwestErrorExt};
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

use crate::types::{Coordinate, GeocodeError, PlaceDescription};

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeocodeCandidate {
    #[serde(default)]
    components: GeocodeComponents,
}

#[derive(Debug, Default, Deserialize)]
struct GeocodeComponents {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    county: Option<String>,
    state: Option<String>,
    state_code: Option<String>,
    country_code: Option<String>,
}

impl From<GeocodeComponents> for PlaceDescription {
    fn from(components: GeocodeComponents) -> Self {
        // Smaller places have no `city`; take the closest thing to one
        let city = components
            .city
            .or(components.town)
            .or(components.village)
            .or(components.municipality)
            .or(components.county)
            .unwrap_or_default();

        Self {
            city,
            state: components
                .state
                .or(components.state_code)
                .unwrap_or_default(),
            country_code: components.country_code.unwrap_or_default(),
        }
    }
}

/// Anything that can name the place at a coordinate.
#[async_trait]
pub trait PlaceLookup: Send + Sync {
    /// `Ok(None)` means the lookup succeeded but there is nothing to show.
    async fn reverse_geocode(
        &self,
        coordinate: &Coordinate,
    ) -> Result<Option<PlaceDescription>, GeocodeError>;
}

#[derive(Debug, Clone)]
pub struct GeocodeClient {
    client: Client,
    endpoint: String,
    api_key: String,
    empty_results: EmptyResultPolicy,
}

impl GeocodeClient {
    pub fn new(config: &GeocodeConfig, timeout: Duration) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GeocodeError::Network(e.into_network_error()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            empty_results: config.empty_results,
        })
    }
}

#[async_trait]
impl PlaceLookup for GeocodeClient {
    #[instrument(skip(self), level = "info")]
    async fn reverse_geocode(
        &self,
        coordinate: &Coordinate,
    ) -> Result<Option<PlaceDescription>, GeocodeError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", coordinate.query_string().as_str()),
                ("key", self.api_key.as_str()),
                ("no_annotations", "1"),
            ])
            .send()
            .await
            .map_err(|e| GeocodeError::Network(e.into_network_error()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!("Reverse geocode returned status {}", status);
            return Err(GeocodeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: GeocodeResponse = response
            .json()
            .await
            .map_err(|e| GeocodeError::Parse(e.to_string()))?;

        match body.results.into_iter().next() {
            Some(candidate) => {
                let place = PlaceDescription::from(candidate.components);
                tracing::info!("Reverse geocoded to: {}", place.display_line());
                Ok(Some(place))
            }
            None => match self.empty_results {
                EmptyResultPolicy::Ignore => {
                    tracing::debug!("Reverse geocode returned no results");
                    Ok(None)
                }
                EmptyResultPolicy::Error => Err(GeocodeError::NoResults),
            },
        }
    }
}
