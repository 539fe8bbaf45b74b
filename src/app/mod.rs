use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{self, Write as _};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use clap::{Parser, ValueEnum};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinSet;
use tracing::debug;
use url::Url;

include!("types.rs");
include!("cache.rs");
include!("fetch.rs");
include!("extract.rs");
include!("audit.rs");
include!("oracle.rs");
include!("report.rs");
include!("data_io.rs");
include!("runtime.rs");
