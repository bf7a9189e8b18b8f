/*!

This is the long-form manual for `orienteering_splits` and `winsplits`.

## Input format

The input is the text export of a class in [WinSplits Online](http://obasen.orientering.se/winsplits/online/).
It is tab-separated, with one line per row of the table shown on the web page:

* two header lines (class name, column names), which are skipped
* then two lines per athlete

```text
1	Alice	5.00		1.00	(1)	2.00	(1)	3.00	(1)	Alice
	Club1			1.00	(1)	3.00	(1)	6.00	(1)	Club1
```

The first line of an athlete holds the position, the name, the total time, the time behind the
winner and then a time and a place for every control, the finish last. The second line holds the
club and the split times. Both lines end with the name (or the club) again, usually followed by a
final tab.

The number of controls is deduced from the number of columns of the first athlete line. Lines
with fewer columns are ignored.

### Times

Times are written `m.ss` or `h:mm.ss` (`1:02.03` is one hour, two minutes and three seconds).
An empty time field means that the athlete has no time at this control, for instance because the
control was missed. Such a time stays missing through the whole analysis: it is never read as
zero.

The total time may instead hold one of the status keywords `dsq` (disqualified), `mp` (missing
punch) or `dns` (did not start).

### Relative and actual times

WinSplits can export the times either as the time behind the fastest athlete at each control
(relative times) or as the elapsed times (actual times). The analysis must be told which one it
reads: see [crate::TimeDataType]. In both cases, the athlete placed first at a control carries
the best time itself. The other representation is derived from the best times.

## Output

The analysis returns a [crate::Dataset]:

* `best`: the best leg and split times at every control, and the optimal total time (the sum of
  the best leg times)
* `second_best`: for every control, all the non-negative relative times in ascending order
* `results`: one entry per athlete, in the order of the export. Each athlete holds its controls,
  the `leg` and `split` series (relative and actual times, places, percentages of the best time),
  the chart points of the split times and its leg statistics.
* `aggregated`: the leg statistics of all athletes as sequences, in the order of `results`
* `mismatches`: the rows that did not have the expected shape

### Leg statistics

A leg is a mistake when the time lost is more than 15% of the best leg time (minor mistake) or
more than 30% (major mistake). The legs are also counted by ranges of time lost, in percent of the
best time: `[0, 1)`, `[1, 2)`, `[2, 4)` and so on up to `[64, 128)`, and above 128%.
The average and median percentage loss are computed over the legs that have a time.

### Mismatches

Every athlete line must end with the name or the club, and must not have more columns than the
first athlete line. When this is not the case, the row is still read and the problem is added to
the `mismatches` list. A leg line without the following club line is dropped.

## Command line

The `winsplits` program reads an export and writes the dataset as JSON.

```text
winsplits --input H21.txt --time-data relative --out H21.json
```

Options:

* `--input`: the export file. It may be UTF-8 or Windows-1252.
* `--time-data`: `relative` (default) or `actual`
* `--out`: the output file, or `stdout` (default)
* `--config`: a JSON configuration file, see below
* `--reference`: a JSON file to compare the output with. The program fails if they differ.
* `--fail-on-mismatch`: fail when a row does not have the expected shape
* `--verbose`: print debugging information

### Configuration file

```json
{
    "inputFile": "H21.txt",
    "typeOfTimeDataToParse": "ACTUAL",
    "outputFile": "H21.json",
    "headerLines": 2,
    "failOnMismatch": true
}
```

All the fields are optional. Relative paths are read from the directory of the configuration
file. Command line options take precedence over the configuration file.

*/
