// Copyright 2025 Medgraph (https://github.com/medgraph)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Identifier resolution boundary.

use crate::error::Result;
use crate::record::NormalizedCurie;
use async_trait::async_trait;
use std::collections::HashMap;

/// Canonicalizes curies via an external identity-resolution service.
///
/// Implementations must return an entry for every requested curie; curies
/// the service cannot resolve degrade to
/// [`NormalizedCurie::identity`](crate::record::NormalizedCurie::identity).
#[async_trait]
pub trait IdResolver: Send + Sync {
    async fn resolve(&self, curies: &[String]) -> Result<HashMap<String, NormalizedCurie>>;
}

/// Resolver that maps every curie to itself. Used in tests and as the
/// fallback when no resolver endpoint is configured.
#[derive(Debug, Default, Clone)]
pub struct PassthroughResolver;

#[async_trait]
impl IdResolver for PassthroughResolver {
    async fn resolve(&self, curies: &[String]) -> Result<HashMap<String, NormalizedCurie>> {
        Ok(curies
            .iter()
            .map(|c| (c.clone(), NormalizedCurie::identity(c)))
            .collect())
    }
}
